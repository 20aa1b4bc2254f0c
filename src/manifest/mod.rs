//! Manifest loading.
//!
//! A manifest is a JSON array of `{ "url": ..., "path": ... }` records. The
//! failure log written at the end of a run uses the same schema, so a failure
//! log can be fed back in as the manifest of a follow-up run.

mod error;
mod path;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use error::ManifestError;
pub use path::DestinationPath;

/// One (source URL, destination path) pair from the manifest.
///
/// The destination is kept exactly as written; normalization happens when the
/// item is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Source URL.
    pub url: String,
    /// Destination path relative to the output directory.
    pub path: String,
}

impl WorkItem {
    /// Creates a work item.
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Returns the normalized destination, or `None` if the path is empty.
    #[must_use]
    pub fn destination(&self) -> Option<DestinationPath> {
        DestinationPath::normalize(&self.path)
    }
}

/// Ordered, read-only list of work items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    items: Vec<WorkItem>,
}

impl Manifest {
    /// Creates a manifest from items in dispatch order.
    #[must_use]
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self { items }
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not an array of
    /// `{url, path}` records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// Reads and parses the manifest file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read and
    /// [`ManifestError::Parse`] if it is not valid manifest JSON.
    #[instrument(level = "debug", fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ManifestError::read(path, e))?;
        let manifest = Self::from_json(&json).map_err(|e| ManifestError::parse(path, e))?;
        debug!(items = manifest.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Returns the items in dispatch order.
    #[must_use]
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the manifest has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns normalized destinations named by more than one item, in order
    /// of their first repeat.
    ///
    /// Such items share one `.bak` temp file when they run concurrently.
    #[must_use]
    pub fn duplicate_destinations(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();

        for destination in self.items.iter().filter_map(WorkItem::destination) {
            let key = destination.to_string();
            if !seen.insert(key.clone()) && reported.insert(key.clone()) {
                duplicates.push(key);
            }
        }
        duplicates
    }
}

impl IntoIterator for Manifest {
    type Item = WorkItem;
    type IntoIter = std::vec::IntoIter<WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<WorkItem> for Manifest {
    fn from_iter<I: IntoIterator<Item = WorkItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
