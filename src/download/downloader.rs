//! Idempotent PDF downloader.
//!
//! A download whose target already exists is skipped without touching the
//! network, which makes re-running a whole crawl cheap: only new or
//! previously failed artifacts are fetched.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::SaveOutcome;
use super::retry::{RetryDecision, RetryPolicy, backoff_sleep, classify_error};
use super::{DownloadError, HttpClient};

/// Result of one [`Downloader::download`] call.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The artifact was fetched and written.
    Persisted {
        /// Final artifact path.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// A file already existed at the target path, either before the request
    /// or by the time the body was complete. The existing file is untouched.
    Skipped {
        /// The existing file.
        path: PathBuf,
    },
    /// The artifact could not be fetched.
    Failed {
        /// Last error seen.
        error: DownloadError,
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl DownloadOutcome {
    /// Returns `true` for [`DownloadOutcome::Persisted`].
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }

    /// Returns `true` for [`DownloadOutcome::Skipped`].
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Downloads PDFs into one output directory with retry.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: HttpClient,
    policy: RetryPolicy,
    output_dir: PathBuf,
}

impl Downloader {
    /// Creates a downloader writing into `output_dir`, which must exist.
    #[must_use]
    pub fn new(client: HttpClient, policy: RetryPolicy, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            policy,
            output_dir: output_dir.into(),
        }
    }

    /// Directory artifacts are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Downloads `pdf_url` to `<output_dir>/<filename>` unless that file exists.
    ///
    /// Transient failures (timeouts, connection errors, 408/429/5xx) are
    /// retried with the policy's backoff. Other statuses end the download on
    /// the attempt that saw them.
    #[instrument(skip(self, cancel), fields(url = %pdf_url))]
    pub async fn download(
        &self,
        pdf_url: &str,
        filename: &str,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        let target = self.output_dir.join(filename);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            info!(path = %target.display(), "skipping existing artifact");
            return DownloadOutcome::Skipped { path: target };
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, "attempting download");

            let error = match self.client.download_to_path(pdf_url, &target, cancel).await {
                Ok(SaveOutcome::Saved(bytes)) => {
                    info!(path = %target.display(), bytes, "downloaded");
                    return DownloadOutcome::Persisted {
                        path: target,
                        bytes,
                    };
                }
                Ok(SaveOutcome::TargetExists) => {
                    info!(path = %target.display(), "artifact written by another task, skipping");
                    return DownloadOutcome::Skipped { path: target };
                }
                Err(e) => e,
            };

            match self.policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    warn!(
                        url = %pdf_url,
                        attempt = next_attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying download"
                    );
                    if !backoff_sleep(delay, cancel).await {
                        return DownloadOutcome::Failed {
                            error: DownloadError::cancelled(pdf_url),
                            attempts: attempt,
                        };
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(
                        url = %pdf_url,
                        attempts = attempt,
                        error = %error,
                        %reason,
                        "download failed"
                    );
                    return DownloadOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
