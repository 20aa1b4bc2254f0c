//! HTTP client wrapper for downloading files.
//!
//! This module provides the `HttpClient` struct which issues the GET for a
//! work item and classifies request, transport and status failures.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::config::HttpTimeouts;
use crate::user_agent;

/// Error building the underlying HTTP client.
#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientError(#[from] reqwest::Error);

/// HTTP client shared by all fetch tasks.
///
/// Cloning is cheap and shares the connection pool, so one client is created
/// at startup and handed to every task.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Request timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(HttpTimeouts {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        })
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the TLS backend or system configuration
    /// prevents the client from being built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(timeouts: HttpTimeouts) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.read_secs))
            .gzip(true)
            .user_agent(user_agent::default_download_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Sends a GET request and returns the response if the server answered 200.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Request`] if `url` is not an absolute http(s) URL
    /// - [`FetchError::Transport`] / [`FetchError::Timeout`] if the request fails
    /// - [`FetchError::BadStatus`] for any status other than 200
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::request(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::request(
                url,
                format!("unsupported scheme {}", parsed.scheme()),
            ));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if status != StatusCode::OK {
            return Err(FetchError::bad_status(url, status.as_u16()));
        }

        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get_invalid_url_is_request_error() {
        let client = HttpClient::new();
        let result = tokio_test::block_on(client.get("not-a-valid-url"));
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }

    #[test]
    fn test_get_unsupported_scheme_is_request_error() {
        let client = HttpClient::new();
        let result = tokio_test::block_on(client.get("ftp://example.com/file.bin"));
        match result {
            Err(FetchError::Request { reason, .. }) => assert!(reason.contains("ftp")),
            other => panic!("Expected Request error, got: {other:?}"),
        }
    }

    #[test]
    fn test_with_timeouts_builds() {
        let client = HttpClient::with_timeouts(HttpTimeouts {
            connect_secs: 1,
            read_secs: 2,
        });
        assert!(client.is_ok());
    }
}
