//! Success and failure aggregators.
//!
//! Each aggregator drains one outcome channel, turns outcomes into console
//! messages, and finishes when its channel is closed and empty.

use std::path::Path;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::failure_log::FailureLog;
use crate::download::{Completion, FailedItem, FetchedItem};
use crate::manifest::WorkItem;

/// Counts gathered by [`drain_successes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuccessTally {
    /// Items downloaded in this run.
    pub downloaded: usize,
    /// Items skipped because their destination already existed.
    pub already_present: usize,
}

impl SuccessTally {
    /// Returns the number of successful items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.already_present
    }
}

/// Result of [`drain_failures`].
#[derive(Debug, Default)]
pub struct FailureReport {
    /// Failed items in arrival order.
    pub log: FailureLog,
    /// Whether the failure log file was written.
    pub persisted: bool,
}

/// Console line for a successful item.
#[must_use]
pub fn success_message(item: &WorkItem) -> String {
    format!("{} downloaded OK", item.path)
}

/// Console line for a failed item.
#[must_use]
pub fn failure_message(item: &WorkItem) -> String {
    format!("{} download failed", item.path)
}

/// Emits one message per successful item until the channel closes.
pub async fn drain_successes(
    mut successes: UnboundedReceiver<FetchedItem>,
    messages: UnboundedSender<String>,
) -> SuccessTally {
    let mut tally = SuccessTally::default();

    while let Some(fetched) = successes.recv().await {
        match fetched.completion {
            Completion::AlreadyPresent => tally.already_present += 1,
            Completion::Downloaded { .. } => tally.downloaded += 1,
        }
        emit(&messages, success_message(&fetched.item));
    }

    debug!(
        downloaded = tally.downloaded,
        already_present = tally.already_present,
        "success channel drained"
    );
    tally
}

/// Emits one message per failed item, then writes the failure log.
///
/// The log is written to `failure_log_path` only if at least one item failed.
/// A serialization or write error is logged and otherwise ignored.
pub async fn drain_failures(
    mut failures: UnboundedReceiver<FailedItem>,
    messages: UnboundedSender<String>,
    failure_log_path: &Path,
) -> FailureReport {
    let mut log = FailureLog::new();

    while let Some(failed) = failures.recv().await {
        emit(&messages, failure_message(&failed.item));
        log.push(failed.item);
    }

    debug!(failed = log.len(), "failure channel drained");

    let persisted = match log.persist(failure_log_path).await {
        Ok(written) => written,
        Err(e) => {
            warn!(
                path = %failure_log_path.display(),
                failed = log.len(),
                error = %e,
                "could not save failure log"
            );
            false
        }
    };

    FailureReport { log, persisted }
}

fn emit(messages: &UnboundedSender<String>, message: String) {
    if messages.send(message).is_err() {
        debug!("message sink closed, dropping message");
    }
}
