//! Item fetcher: downloads one work item and publishes it atomically.
//!
//! The body is streamed into `<destination>.bak` and renamed onto the
//! destination only once fully written, so the destination path never shows
//! partial content. A crash mid-download leaves at most the `.bak` file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::error::FetchError;
use super::outcome::{Completion, Outcome};
use super::HttpClient;
use crate::manifest::WorkItem;

/// Turns a work item into exactly one outcome.
///
/// Implementations must not return early without an outcome; per-item errors
/// are reported as [`Outcome::Failure`].
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `item` and reports how it ended.
    async fn fetch(&self, item: WorkItem) -> Outcome;
}

/// Fetches work items over HTTP into an output directory.
#[derive(Debug, Clone)]
pub struct ItemFetcher {
    client: HttpClient,
    output_dir: PathBuf,
}

impl ItemFetcher {
    /// Creates a fetcher writing beneath `output_dir`.
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Returns the directory destinations are resolved against.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn try_fetch(&self, item: &WorkItem) -> Result<Completion, FetchError> {
        let Some(destination) = item.destination() else {
            return Err(FetchError::empty_destination(&item.url, &item.path));
        };
        let final_path = destination.resolve(&self.output_dir);

        if entry_exists(&final_path).await {
            debug!(path = %final_path.display(), "destination exists, skipping request");
            return Ok(Completion::AlreadyPresent);
        }

        let response = self.client.get(&item.url).await?;

        if destination.has_parent()
            && let Some(parent) = final_path.parent()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::write(parent, e))?;
        }

        let temp_path = destination.resolve_temp(&self.output_dir);
        let bytes = match write_temp_file(response, &item.url, &temp_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %temp_path.display(), "removing temp file after error");
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };

        publish(&temp_path, &final_path).await?;

        info!(path = %final_path.display(), bytes, "download complete");
        Ok(Completion::Downloaded { bytes })
    }
}

#[async_trait]
impl Fetch for ItemFetcher {
    #[instrument(skip(self, item), fields(url = %item.url, path = %item.path))]
    async fn fetch(&self, item: WorkItem) -> Outcome {
        match self.try_fetch(&item).await {
            Ok(completion) => Outcome::success(item, completion),
            Err(error) => {
                warn!(
                    url = %item.url,
                    path = %item.path,
                    reason = error.reason(),
                    error = %error,
                    "download failed"
                );
                Outcome::failure(item, error)
            }
        }
    }
}

/// Returns true if any filesystem entry (file, directory, symlink target) exists at `path`.
async fn entry_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// Streams the response body into `temp_path`, truncating it first.
///
/// Returns the number of bytes written.
async fn write_temp_file(
    response: reqwest::Response,
    url: &str,
    temp_path: &Path,
) -> Result<u64, FetchError> {
    let file = File::create(temp_path)
        .await
        .map_err(|e| FetchError::write(temp_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::transport(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::write(temp_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::write(temp_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| FetchError::write(temp_path, e))?;

    Ok(bytes_written)
}

/// Renames the fully written temp file onto its destination.
async fn publish(temp_path: &Path, final_path: &Path) -> Result<(), FetchError> {
    tokio::fs::rename(temp_path, final_path)
        .await
        .map_err(|e| FetchError::publish(temp_path, final_path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Port 9 (discard) on localhost; any request made here would fail as a transport error.
    const UNREACHABLE_URL: &str = "http://127.0.0.1:9/never-requested.bin";

    fn fetcher(temp_dir: &TempDir) -> ItemFetcher {
        ItemFetcher::new(HttpClient::new(), temp_dir.path())
    }

    #[tokio::test]
    async fn test_fetch_empty_destination_fails_without_request() {
        let temp_dir = TempDir::new().unwrap();

        for raw in ["", "///", "\\\\"] {
            let outcome = fetcher(&temp_dir)
                .fetch(WorkItem::new(UNREACHABLE_URL, raw))
                .await;
            match outcome {
                Outcome::Failure(failed) => {
                    assert!(
                        matches!(failed.error, FetchError::EmptyDestination { .. }),
                        "Expected EmptyDestination for {raw:?}, got: {:?}",
                        failed.error
                    );
                    assert_eq!(failed.item.path, raw);
                }
                Outcome::Success(_) => panic!("empty destination {raw:?} must fail"),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_existing_destination_is_success_without_request() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("img")).unwrap();
        std::fs::write(temp_dir.path().join("img/1.png"), b"old").unwrap();

        let outcome = fetcher(&temp_dir)
            .fetch(WorkItem::new(UNREACHABLE_URL, "img\\\\1.png"))
            .await;

        match outcome {
            Outcome::Success(fetched) => {
                assert_eq!(fetched.completion, Completion::AlreadyPresent);
            }
            Outcome::Failure(failed) => panic!("Expected skip, got: {:?}", failed.error),
        }
        assert_eq!(std::fs::read(temp_dir.path().join("img/1.png")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_fetch_existing_directory_counts_as_present() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("already/here")).unwrap();

        let fetcher = fetcher(&temp_dir);
        assert_eq!(fetcher.output_dir(), temp_dir.path());

        let outcome = fetcher
            .fetch(WorkItem::new(UNREACHABLE_URL, "already/here"))
            .await;
        assert!(outcome.is_success());
        assert_eq!(outcome.item().path, "already/here");
    }

    #[tokio::test]
    async fn test_fetch_stale_temp_file_does_not_count_as_present() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.bin.bak"), b"partial").unwrap();

        let outcome = fetcher(&temp_dir)
            .fetch(WorkItem::new(UNREACHABLE_URL, "a.bin"))
            .await;

        assert!(!outcome.is_success(), "stale .bak must not satisfy the skip check");
        assert!(!temp_dir.path().join("a.bin").exists());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_is_request_failure() {
        let temp_dir = TempDir::new().unwrap();

        let outcome = fetcher(&temp_dir)
            .fetch(WorkItem::new("not a url", "a.bin"))
            .await;

        match outcome {
            Outcome::Failure(failed) => assert_eq!(failed.error.reason(), "RequestError"),
            Outcome::Success(_) => panic!("invalid URL must fail"),
        }
    }

    #[tokio::test]
    async fn test_publish_moves_temp_onto_destination() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join("a.bin.bak");
        let final_path = temp_dir.path().join("a.bin");
        std::fs::write(&temp_path, b"complete").unwrap();

        publish(&temp_path, &final_path).await.unwrap();

        assert!(!temp_path.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"complete");
    }

    #[tokio::test]
    async fn test_publish_missing_temp_is_publish_error() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path().join("missing.bak");
        let final_path = temp_dir.path().join("missing");

        let result = publish(&temp_path, &final_path).await;

        assert!(matches!(result, Err(FetchError::Publish { .. })));
        assert!(!final_path.exists());
    }
}
