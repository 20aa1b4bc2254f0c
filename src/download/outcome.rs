//! Terminal result of fetching one work item.

use super::error::FetchError;
use crate::manifest::WorkItem;

/// How a successful item reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Something already existed at the destination; no request was made.
    AlreadyPresent,
    /// The body was downloaded and published.
    Downloaded {
        /// Bytes written to the destination.
        bytes: u64,
    },
}

/// A work item that reached its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    /// The work item.
    pub item: WorkItem,
    /// How it completed.
    pub completion: Completion,
}

/// A work item that failed, with the reason.
#[derive(Debug)]
pub struct FailedItem {
    /// The work item, as read from the manifest.
    pub item: WorkItem,
    /// Why it failed.
    pub error: FetchError,
}

/// Exactly one outcome is produced per work item.
#[derive(Debug)]
pub enum Outcome {
    /// The item is present at its destination.
    Success(FetchedItem),
    /// The item could not be fetched.
    Failure(FailedItem),
}

impl Outcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(item: WorkItem, completion: Completion) -> Self {
        Self::Success(FetchedItem { item, completion })
    }

    /// Creates a failure outcome.
    #[must_use]
    pub fn failure(item: WorkItem, error: FetchError) -> Self {
        Self::Failure(FailedItem { item, error })
    }

    /// Returns the work item this outcome belongs to.
    #[must_use]
    pub fn item(&self) -> &WorkItem {
        match self {
            Self::Success(fetched) => &fetched.item,
            Self::Failure(failed) => &failed.item,
        }
    }

    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
