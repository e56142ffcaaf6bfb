//! HTTP client wrapper for page fetches and PDF downloads.
//!
//! This module provides the [`HttpClient`] struct which issues single GET
//! requests with the configured User-Agent and per-attempt timeout. It knows
//! nothing about retries or crawl structure; see [`Fetcher`](super::Fetcher)
//! and [`Downloader`](super::Downloader) for those.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use super::error::DownloadError;
use super::filename::create_partial_file;
use crate::user_agent;

/// What [`HttpClient::download_to_path`] did with a complete body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The body now lives at the target. Holds the bytes written.
    Saved(u64),
    /// Another writer created the target first; this body was discarded.
    TargetExists,
}

/// HTTP client for page fetches and streaming downloads.
///
/// Cheap to clone; clones share one connection pool.
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
    /// Creates a client with the default User-Agent and a 120 second timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_settings(
            user_agent::DEFAULT_USER_AGENT,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
        .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client sending `user_agent` on every request, with `timeout`
    /// bounding each request from connect to the last body byte.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised or
    /// the User-Agent is not a valid header value.
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let connect_timeout = timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS));
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails or
    /// times out, the server answers with a non-2xx status, or `cancel` fires.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn get_text(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DownloadError> {
        let response = self.send_get(url, cancel).await?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        let text = cancellable(cancel, url, response.text())
            .await?
            .map_err(|e| DownloadError::from_reqwest(url, e))?;
        debug!(bytes = text.len(), "page fetched");
        Ok(text)
    }

    /// Downloads `url` into `target`.
    ///
    /// Only a `200 OK` response is persisted. The body streams into a
    /// uniquely named in-progress file beside `target`, which is moved onto
    /// `target` only once complete and only if nothing exists there yet. A
    /// file at `target` is therefore always a whole body from one response.
    /// The in-progress file is removed on any failure.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for invalid URLs, network failures, timeouts,
    /// any status other than 200, IO failures, or cancellation.
    #[instrument(skip(self, cancel), fields(url = %url, target = %target.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome, DownloadError> {
        let response = self.send_get(url, cancel).await?;

        if response.status() != StatusCode::OK {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        let dir = target
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let partial = run_blocking(target, move || create_partial_file(&dir)).await?;
        let (std_file, partial_path) = partial.into_parts();
        let mut file = File::from_std(std_file);

        let stream_result = cancellable(
            cancel,
            url,
            stream_to_file(&mut file, response, url, &partial_path),
        )
        .await
        .and_then(|inner| inner);
        drop(file);

        // Dropping `partial_path` deletes the in-progress file.
        let bytes_written = match stream_result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %partial_path.display(), "discarding partial file after error");
                return Err(e);
            }
        };

        let destination = target.to_path_buf();
        let saved = run_blocking(target, move || {
            match partial_path.persist_noclobber(&destination) {
                Ok(()) => Ok(true),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e.error),
            }
        })
        .await?;

        if saved {
            Ok(SaveOutcome::Saved(bytes_written))
        } else {
            debug!("target appeared during download, discarding body");
            Ok(SaveOutcome::TargetExists)
        }
    }

    async fn send_get(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        cancellable(cancel, url, self.client.get(url).send())
            .await?
            .map_err(|e| DownloadError::from_reqwest(url, e))
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Runs a blocking filesystem operation off the async worker threads.
async fn run_blocking<T, F>(path: &Path, op: F) -> Result<T, DownloadError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(io::Error::other)
        .and_then(|result| result)
        .map_err(|e| DownloadError::io(path, e))
}

/// Runs `future` unless `cancel` fires first.
async fn cancellable<F, T>(
    cancel: &CancellationToken,
    url: &str,
    future: F,
) -> Result<T, DownloadError>
where
    F: Future<Output = T>,
{
    if cancel.is_cancelled() {
        return Err(DownloadError::cancelled(url));
    }
    tokio::select! {
        output = future => Ok(output),
        () = cancel.cancelled() => Err(DownloadError::cancelled(url)),
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::download::filename::is_partial_file;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn leftover_partials(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| is_partial_file(&entry.as_ref().unwrap().file_name().to_string_lossy()))
            .count()
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/paper_files/paper/2020"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/paper_files/paper/2020", mock_server.uri());
        let body = client.get_text(&url, &CancellationToken::new()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_get_text_sends_configured_user_agent() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", "papercrawl-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("root"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client =
            HttpClient::with_settings("papercrawl-test/1.0", Duration::from_secs(5)).unwrap();
        let body = client
            .get_text(&format!("{}/", mock_server.uri()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "root");
    }

    #[tokio::test]
    async fn test_get_text_non_success_is_http_status_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let result = client
            .get_text(&format!("{}/missing", mock_server.uri()), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(DownloadError::HttpStatus { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_get_text_invalid_url() {
        let client = HttpClient::new();
        let result = client.get_text("not-a-valid-url", &CancellationToken::new()).await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_get_text_cancelled_before_start() {
        let client = HttpClient::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = client.get_text("https://example.invalid/", &cancel).await;
        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_download_to_path_writes_file_and_removes_partial() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/file/abc-Paper.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let target = temp_dir.path().join("Paper.pdf");
        let saved = client
            .download_to_path(
                &format!("{}/file/abc-Paper.pdf", mock_server.uri()),
                &target,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(saved, SaveOutcome::Saved(13));
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.4 body");
        assert_eq!(leftover_partials(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_download_to_path_never_replaces_existing_target() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/file/late-Paper.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second body".to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let target = temp_dir.path().join("Shared.pdf");
        std::fs::write(&target, b"first body").unwrap();

        let saved = HttpClient::new()
            .download_to_path(
                &format!("{}/file/late-Paper.pdf", mock_server.uri()),
                &target,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(saved, SaveOutcome::TargetExists);
        assert_eq!(std::fs::read(&target).unwrap(), b"first body");
        assert_eq!(leftover_partials(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_download_to_path_non_200_leaves_nothing() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/gone.pdf"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let target = temp_dir.path().join("Gone.pdf");
        let result = client
            .download_to_path(
                &format!("{}/gone.pdf", mock_server.uri()),
                &target,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(DownloadError::HttpStatus { status: 410, .. })));
        assert!(!target.exists());
        assert_eq!(leftover_partials(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_download_to_path_timeout_cleans_partial() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/slow.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::with_settings("test", Duration::from_millis(300)).unwrap();
        let target = temp_dir.path().join("Slow.pdf");
        let result = client
            .download_to_path(
                &format!("{}/slow.pdf", mock_server.uri()),
                &target,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(DownloadError::Timeout { .. })));
        assert!(!target.exists());
        assert_eq!(leftover_partials(temp_dir.path()), 0);
    }
}
