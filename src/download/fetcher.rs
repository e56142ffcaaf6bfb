//! Page fetcher with retry and linear backoff.
//!
//! [`Fetcher::fetch`] never returns an error: a page that cannot be fetched
//! within the retry budget is logged and reported as `None`, which callers
//! treat as "nothing to process here".

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::retry::{RetryPolicy, backoff_sleep};
use super::{DownloadError, HttpClient};

/// Fetches HTML pages, retrying every failure class until the budget is spent.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: HttpClient,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher over a shared client.
    #[must_use]
    pub fn new(client: HttpClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url` as text.
    ///
    /// Attempts the request up to `max_attempts` times. After failed attempt
    /// `n` (other than the last) it waits the policy's backoff for `n`. Every
    /// failed attempt is logged; the final failure returns `None`. Returns
    /// `None` promptly once `cancel` fires.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Option<String> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "fetching page");

            let error = match self.client.get_text(url, cancel).await {
                Ok(body) => return Some(body),
                Err(DownloadError::Cancelled { .. }) => {
                    debug!("fetch abandoned after cancellation");
                    return None;
                }
                Err(e) => e,
            };

            let Some(delay) = self.policy.next_delay(attempt) else {
                warn!(
                    url = %url,
                    attempts = attempt,
                    error = %error,
                    "failed to fetch page after all attempts"
                );
                return None;
            };

            warn!(
                url = %url,
                attempt,
                max_attempts = self.policy.max_attempts(),
                delay_ms = delay.as_millis(),
                error = %error,
                "page fetch failed, retrying"
            );

            if !backoff_sleep(delay, cancel).await {
                debug!("fetch abandoned during backoff");
                return None;
            }
        }
    }
}
