//! Batch pipeline: dispatcher → outcome channels → aggregators → message sink.
//!
//! Shutdown order is fixed:
//! 1. the dispatcher waits for every fetch task and drops the outcome senders
//! 2. both aggregators drain their channel and finish (the failure log is
//!    written here)
//! 3. the completion banner is queued and the message channel is closed
//! 4. the sink drains the remaining messages and hands the writer back
//!
//! # Example
//!
//! ```no_run
//! use batch_downloader::{BatchConfig, BatchRunner, Manifest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load(std::path::Path::new("manifest.json")).await?;
//! let runner = BatchRunner::new(BatchConfig::default())?;
//! let (summary, _stdout) = runner.run(manifest, tokio::io::stdout()).await?;
//! println!("{} failed", summary.failed);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, instrument};

use crate::config::{BatchConfig, ConfigError};
use crate::download::{
    ClientError, Dispatcher, EngineError, Fetch, HttpClient, ItemFetcher, OutcomeSenders,
};
use crate::manifest::Manifest;
use crate::report::{drain_failures, drain_messages, drain_successes};

/// Errors that stop a batch as a whole. Per-item failures never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration is out of range.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The dispatcher failed.
    #[error("dispatcher error: {0}")]
    Engine(#[from] EngineError),

    /// An aggregator or the sink task panicked or was cancelled.
    #[error("report task failed: {0}")]
    Task(#[from] JoinError),

    /// Writing console output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Counts for one finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items handed to fetch tasks.
    pub dispatched: usize,
    /// Items downloaded in this run.
    pub downloaded: usize,
    /// Items skipped because their destination already existed.
    pub already_present: usize,
    /// Items that failed.
    pub failed: usize,
    /// Whether the failure log file was written.
    pub failure_log_written: bool,
}

impl BatchSummary {
    /// Returns the number of successful items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.downloaded + self.already_present
    }

    /// Returns the completion banner printed after the per-item lines.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "batch download complete: {} succeeded ({} downloaded, {} already present), {} failed",
            self.succeeded(),
            self.downloaded,
            self.already_present,
            self.failed
        )
    }
}

/// Runs manifests through the fetch pipeline.
pub struct BatchRunner {
    config: BatchConfig,
    dispatcher: Dispatcher,
    fetcher: Arc<dyn Fetch>,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl BatchRunner {
    /// Creates a runner that downloads over HTTP into `config.output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for out-of-range values and
    /// [`PipelineError::Client`] if the HTTP client cannot be built.
    pub fn new(config: BatchConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let client = HttpClient::with_timeouts(config.timeouts)?;
        let fetcher = Arc::new(ItemFetcher::new(client, config.output_dir.clone()));
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a runner around an arbitrary fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for out-of-range values.
    pub fn with_fetcher(config: BatchConfig, fetcher: Arc<dyn Fetch>) -> Result<Self, PipelineError> {
        config.validate()?;
        let dispatcher = Dispatcher::new(config.concurrency, config.mode)?;
        Ok(Self {
            config,
            dispatcher,
            fetcher,
        })
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Fetches every manifest item, writes one line per item plus the
    /// completion banner to `out`, and writes the failure log if anything
    /// failed.
    ///
    /// Returns the summary and the writer once everything has been flushed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] only for pipeline-level problems; per-item
    /// failures are counted in the summary.
    #[instrument(skip(self, manifest, out), fields(items = manifest.len()))]
    pub async fn run<W>(
        &self,
        manifest: Manifest,
        out: W,
    ) -> Result<(BatchSummary, W), PipelineError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (senders, receivers) = OutcomeSenders::channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        let sink = tokio::spawn(drain_messages(message_rx, out));
        let successes = tokio::spawn(drain_successes(receivers.success, message_tx.clone()));
        let failures = {
            let message_tx = message_tx.clone();
            let failure_log = self.config.failure_log.clone();
            tokio::spawn(async move {
                drain_failures(receivers.failure, message_tx, &failure_log).await
            })
        };

        // Senders are consumed: both outcome channels are closed once this returns
        let dispatched = self
            .dispatcher
            .run(manifest, Arc::clone(&self.fetcher), senders)
            .await;

        let tally = successes.await?;
        let report = failures.await?;
        let dispatched = dispatched?;
        debug!("aggregators finished");

        let summary = BatchSummary {
            dispatched,
            downloaded: tally.downloaded,
            already_present: tally.already_present,
            failed: report.log.len(),
            failure_log_written: report.persisted,
        };

        // Last message; the sink stops once this sender is gone
        let _ = message_tx.send(summary.banner());
        drop(message_tx);
        let out = sink.await?.map_err(PipelineError::Output)?;

        info!(
            dispatched = summary.dispatched,
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            failed = summary.failed,
            failure_log_written = summary.failure_log_written,
            "batch complete"
        );
        if summary.failure_log_written {
            info!(path = %self.config.failure_log.display(), "failed items saved");
        }

        Ok((summary, out))
    }
}
