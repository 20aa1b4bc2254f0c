//! Dispatcher: runs fetch tasks under a concurrency cap.
//!
//! Two admission strategies are supported:
//!
//! - [`ConcurrencyMode::Batch`] (default): items are admitted in fixed groups
//!   of `concurrency`. The next group starts only after every task of the
//!   current group has produced an outcome, so one slow item holds back the
//!   whole group.
//! - [`ConcurrencyMode::SlidingWindow`]: a semaphore admits the next item as
//!   soon as any running task finishes.
//!
//! Every outcome is routed to either the success or the failure channel by the
//! task that produced it. Both senders are dropped when [`Dispatcher::run`]
//! returns, which closes the channels and lets the aggregators finish.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use batch_downloader::download::{
//!     ConcurrencyMode, Dispatcher, HttpClient, ItemFetcher, OutcomeSenders,
//! };
//! use batch_downloader::manifest::Manifest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load(std::path::Path::new("manifest.json")).await?;
//! let fetcher = Arc::new(ItemFetcher::new(HttpClient::new(), "."));
//! let (senders, mut receivers) = OutcomeSenders::channel();
//! let dispatcher = Dispatcher::new(5, ConcurrencyMode::Batch)?;
//! let dispatched = dispatcher.run(manifest, fetcher, senders).await?;
//! # let _ = (dispatched, &mut receivers);
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::error::FetchError;
use super::fetcher::Fetch;
use super::outcome::{FailedItem, FetchedItem, Outcome};
use crate::manifest::{Manifest, WorkItem};

/// Error type for dispatcher operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// How the dispatcher admits new fetch tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Fixed groups of `concurrency` items with a barrier between groups.
    #[default]
    Batch,
    /// At most `concurrency` tasks in flight; a finished task frees a slot immediately.
    SlidingWindow,
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => f.write_str("batch"),
            Self::SlidingWindow => f.write_str("sliding-window"),
        }
    }
}

/// Sending halves of the success and failure channels.
///
/// Cloned into every fetch task. The channels close once the last clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct OutcomeSenders {
    success: mpsc::UnboundedSender<FetchedItem>,
    failure: mpsc::UnboundedSender<FailedItem>,
}

/// Receiving halves of the success and failure channels.
#[derive(Debug)]
pub struct OutcomeReceivers {
    /// Successful items, in completion order.
    pub success: mpsc::UnboundedReceiver<FetchedItem>,
    /// Failed items, in completion order.
    pub failure: mpsc::UnboundedReceiver<FailedItem>,
}

impl OutcomeSenders {
    /// Creates the two outcome channels.
    #[must_use]
    pub fn channel() -> (Self, OutcomeReceivers) {
        let (success_tx, success_rx) = mpsc::unbounded_channel();
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        (
            Self {
                success: success_tx,
                failure: failure_tx,
            },
            OutcomeReceivers {
                success: success_rx,
                failure: failure_rx,
            },
        )
    }

    /// Routes an outcome to its channel.
    ///
    /// A closed receiver means the aggregator is gone; the outcome is logged
    /// and dropped.
    pub fn route(&self, outcome: Outcome) {
        let sent = match outcome {
            Outcome::Success(fetched) => self
                .success
                .send(fetched)
                .map_err(|e| e.0.item.url),
            Outcome::Failure(failed) => self
                .failure
                .send(failed)
                .map_err(|e| e.0.item.url),
        };
        if let Err(url) = sent {
            warn!(url = %url, "outcome channel closed, dropping outcome");
        }
    }
}

/// Runs one fetch task per manifest item under a concurrency cap.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    mode: ConcurrencyMode,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `concurrency` is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use batch_downloader::download::{ConcurrencyMode, Dispatcher};
    ///
    /// let dispatcher = Dispatcher::new(5, ConcurrencyMode::Batch).unwrap();
    /// assert_eq!(dispatcher.concurrency(), 5);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize, mode: ConcurrencyMode) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self { concurrency, mode })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured admission mode.
    #[must_use]
    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Fetches every manifest item and routes each outcome exactly once.
    ///
    /// Returns the number of items dispatched once all tasks have finished.
    /// `senders` is consumed and dropped on return, closing both channels.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the sliding-window semaphore
    /// is closed. Individual fetch failures never cause an error here.
    #[instrument(skip(self, manifest, fetcher, senders), fields(items = manifest.len(), concurrency = self.concurrency, mode = %self.mode))]
    pub async fn run(
        &self,
        manifest: Manifest,
        fetcher: Arc<dyn Fetch>,
        senders: OutcomeSenders,
    ) -> Result<usize, EngineError> {
        info!("dispatching manifest");
        for destination in manifest.duplicate_destinations() {
            warn!(path = %destination, "destination named by more than one item");
        }

        let dispatched = match self.mode {
            ConcurrencyMode::Batch => self.run_batches(manifest, &fetcher, &senders).await,
            ConcurrencyMode::SlidingWindow => {
                self.run_sliding_window(manifest, &fetcher, &senders)
                    .await?
            }
        };

        info!(dispatched, "all fetch tasks finished");
        Ok(dispatched)
    }

    async fn run_batches(
        &self,
        manifest: Manifest,
        fetcher: &Arc<dyn Fetch>,
        senders: &OutcomeSenders,
    ) -> usize {
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        for (index, item) in manifest.into_iter().enumerate() {
            if index % self.concurrency == 0 && !tasks.is_empty() {
                debug!(batch = index / self.concurrency, "waiting for previous batch");
                join_all(&mut tasks).await;
            }
            spawn_fetch(&mut tasks, Arc::clone(fetcher), senders.clone(), item);
            dispatched += 1;
        }

        join_all(&mut tasks).await;
        dispatched
    }

    async fn run_sliding_window(
        &self,
        manifest: Manifest,
        fetcher: &Arc<dyn Fetch>,
        senders: &OutcomeSenders,
    ) -> Result<usize, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut dispatched = 0;

        for item in manifest {
            // Blocks while `concurrency` tasks are in flight
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let fetcher = Arc::clone(fetcher);
            let senders = senders.clone();
            tasks.spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                fetch_and_route(fetcher, senders, item).await;
            });
            dispatched += 1;

            while let Some(result) = tasks.try_join_next() {
                log_join_error(result);
            }
        }

        join_all(&mut tasks).await;
        Ok(dispatched)
    }
}

fn spawn_fetch(
    tasks: &mut JoinSet<()>,
    fetcher: Arc<dyn Fetch>,
    senders: OutcomeSenders,
    item: WorkItem,
) {
    tasks.spawn(fetch_and_route(fetcher, senders, item));
}

/// Fetches one item and routes its outcome.
///
/// A panicking fetcher still yields a failure outcome for the item.
async fn fetch_and_route(fetcher: Arc<dyn Fetch>, senders: OutcomeSenders, item: WorkItem) {
    let fallback = item.clone();
    let outcome = match AssertUnwindSafe(fetcher.fetch(item)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            warn!(url = %fallback.url, path = %fallback.path, %detail, "fetch task panicked");
            Outcome::failure(
                fallback.clone(),
                FetchError::aborted(fallback.url, detail),
            )
        }
    };
    senders.route(outcome);
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.join_next().await {
        log_join_error(result);
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    // Panics are caught inside the task; only cancellation reaches here
    if let Err(e) = result {
        warn!(error = %e, "fetch task did not complete");
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
