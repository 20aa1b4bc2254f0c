//! Fetching work items with bounded concurrency.
//!
//! - [`HttpClient`] issues the GET and classifies status/transport failures
//! - [`ItemFetcher`] turns one work item into one [`Outcome`], publishing the
//!   body atomically through a `.bak` temp file
//! - [`Dispatcher`] runs fetch tasks under a concurrency cap and routes each
//!   outcome to the success or failure channel
//!
//! # Example
//!
//! ```no_run
//! use batch_downloader::download::{Fetch, HttpClient, ItemFetcher, Outcome};
//! use batch_downloader::manifest::WorkItem;
//!
//! # async fn example() {
//! let fetcher = ItemFetcher::new(HttpClient::new(), "./downloads");
//! let outcome = fetcher
//!     .fetch(WorkItem::new("https://example.com/1.png", "img/1.png"))
//!     .await;
//! if let Outcome::Failure(failed) = outcome {
//!     eprintln!("{} failed: {}", failed.item.path, failed.error);
//! }
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod fetcher;
mod outcome;

pub use client::{ClientError, HttpClient};
pub use constants::DEFAULT_CONCURRENCY;
pub use engine::{ConcurrencyMode, Dispatcher, EngineError, OutcomeReceivers, OutcomeSenders};
pub use error::FetchError;
pub use fetcher::{Fetch, ItemFetcher};
pub use outcome::{Completion, FailedItem, FetchedItem, Outcome};

// Note: no module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
