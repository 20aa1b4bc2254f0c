//! Persisted list of failed work items.
//!
//! The file uses the manifest schema (`[{"url": .., "path": ..}]`) so it can be
//! passed back as the manifest of a follow-up run.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::manifest::WorkItem;

/// Errors writing the failure log. Never fatal for a run.
#[derive(Debug, Error)]
pub enum FailureLogError {
    /// The failed items could not be serialized.
    #[error("failed to serialize failure log: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The failure log file could not be written.
    #[error("failed to write failure log {path}: {source}")]
    Write {
        /// Path of the failure log.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Failed work items in the order their failures arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLog {
    items: Vec<WorkItem>,
}

impl FailureLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failed item.
    pub fn push(&mut self, item: WorkItem) {
        self.items.push(item);
    }

    /// Returns the failed items in arrival order.
    #[must_use]
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Returns the number of failed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Writes the log to `path` as a JSON array if it has any entries.
    ///
    /// Returns whether a file was written. An empty log leaves `path` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FailureLogError`] if serialization or the write fails.
    #[instrument(level = "debug", skip(self), fields(path = %path.display(), items = self.len()))]
    pub async fn persist(&self, path: &Path) -> Result<bool, FailureLogError> {
        if self.is_empty() {
            return Ok(false);
        }

        let json = serde_json::to_vec_pretty(&self.items)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| FailureLogError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("failure log written");
        Ok(true)
    }
}
