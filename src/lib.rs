//! Batch Downloader Library
//!
//! Downloads every entry of a JSON manifest (`[{"url": .., "path": ..}]`)
//! with bounded concurrency, reports one line per item, and saves the failed
//! entries in the same format so they can be fed back in later.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`manifest`] - Manifest loading and destination path normalization
//! - [`download`] - HTTP fetcher with atomic publish, and the dispatcher
//! - [`report`] - Success/failure aggregators, failure log, message sink
//! - [`pipeline`] - Wires the above together with a fixed shutdown order
//! - [`config`] - Run configuration and validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod manifest;
pub mod pipeline;
pub mod report;
mod user_agent;

// Re-export commonly used types
pub use config::{BatchConfig, ConfigError, HttpTimeouts};
pub use download::{
    Completion, ConcurrencyMode, DEFAULT_CONCURRENCY, Dispatcher, EngineError, Fetch, FetchError,
    HttpClient, ItemFetcher, Outcome,
};
pub use manifest::{DestinationPath, Manifest, ManifestError, WorkItem};
pub use pipeline::{BatchRunner, BatchSummary, PipelineError};
pub use report::{FailureLog, FailureLogError};
