//! Run configuration for a batch.
//!
//! The CLI builds a [`BatchConfig`] from its flags; library callers can start
//! from [`BatchConfig::default`] and override fields.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::ConcurrencyMode;
use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY,
    READ_TIMEOUT_SECS,
};

/// Default manifest file, relative to the working directory.
pub const DEFAULT_MANIFEST_FILE: &str = "manifest.json";

/// Default failure log file, relative to the working directory.
pub const DEFAULT_FAILURE_LOG_FILE: &str = "failed.json";

/// Default append-only process log file, relative to the working directory.
pub const DEFAULT_PROCESS_LOG_FILE: &str = "daily.log";

/// Largest accepted timeout in seconds.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency outside the supported range.
    #[error(
        "invalid concurrency {value}: expected range {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
    )]
    Concurrency {
        /// The rejected value.
        value: usize,
    },

    /// Timeout outside the supported range.
    #[error("invalid {field} {value}s: expected range 1..={MAX_TIMEOUT_SECS}")]
    Timeout {
        /// Which timeout was rejected.
        field: &'static str,
        /// The rejected value in seconds.
        value: u64,
    },
}

/// HTTP client timeouts in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Time allowed to establish a connection.
    pub connect_secs: u64,
    /// Time allowed for the whole request, body included.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Everything a batch run needs besides the manifest itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of fetch tasks in flight.
    pub concurrency: usize,
    /// Admission strategy for fetch tasks.
    pub mode: ConcurrencyMode,
    /// Directory manifest destinations are resolved against.
    pub output_dir: PathBuf,
    /// Where failed items are written at the end of the run.
    pub failure_log: PathBuf,
    /// HTTP client timeouts.
    pub timeouts: HttpTimeouts,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            mode: ConcurrencyMode::default(),
            output_dir: PathBuf::from("."),
            failure_log: PathBuf::from(DEFAULT_FAILURE_LOG_FILE),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl BatchConfig {
    /// Checks every value against its supported range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::Concurrency {
                value: self.concurrency,
            });
        }
        validate_timeout_secs("connect timeout", self.timeouts.connect_secs)?;
        validate_timeout_secs("request timeout", self.timeouts.read_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Timeout { field, value })
    }
}
