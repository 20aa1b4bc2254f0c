//! Error types for the download module.
//!
//! Every per-item failure is a [`FetchError`]. Fetch errors never cross task
//! boundaries as `Err`; the fetcher wraps them in a failure outcome.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a single work item can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The destination path contains no segments after normalization.
    #[error("empty destination path {path:?} for {url}")]
    EmptyDestination {
        /// The URL of the item.
        url: String,
        /// The destination path as written in the manifest.
        path: String,
    },

    /// The request could not be built (malformed or unsupported URL).
    #[error("invalid request URL {url}: {reason}")]
    Request {
        /// The URL that could not be requested.
        url: String,
        /// Why the request could not be built.
        reason: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, body read).
    #[error("transport error downloading {url}: {source}")]
    Transport {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within the configured timeout.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with something other than 200 OK.
    #[error("HTTP {status} downloading {url}")]
    BadStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Creating directories or writing the temporary file failed.
    #[error("IO error writing to {path}: {source}")]
    Write {
        /// The file or directory path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temporary file onto the destination failed.
    #[error("failed to publish {from} as {to}: {source}")]
    Publish {
        /// The temporary file.
        from: PathBuf,
        /// The final destination.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The fetch task panicked before producing an outcome.
    #[error("fetch task for {url} aborted: {detail}")]
    Aborted {
        /// The URL of the item.
        url: String,
        /// The panic payload, when it was a string.
        detail: String,
    },
}

impl FetchError {
    /// Creates an empty-destination error.
    pub fn empty_destination(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self::EmptyDestination {
            url: url.into(),
            path: path.into(),
        }
    }

    /// Creates a request construction error.
    pub fn request(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a transport error, promoting timeouts to [`FetchError::Timeout`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Transport {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a bad-status error.
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a publish (rename) error.
    pub fn publish(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Publish {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Creates an aborted-task error.
    pub fn aborted(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Aborted {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Returns the stable reason label used in diagnostics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyDestination { .. } => "EmptyDestination",
            Self::Request { .. } => "RequestError",
            Self::Transport { .. } | Self::Timeout { .. } => "TransportError",
            Self::BadStatus { .. } => "BadStatus",
            Self::Write { .. } => "WriteError",
            Self::Publish { .. } => "PublishError",
            Self::Aborted { .. } => "Aborted",
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error does not carry.
