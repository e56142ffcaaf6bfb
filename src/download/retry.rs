//! Retry logic with configurable backoff for transient fetch failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying fetch errors and determining retry behavior.
//!
//! # Overview
//!
//! When a request fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//! - [`FailureType::RateLimited`] - Server rate limiting (retries with backoff)
//!
//! The [`RetryPolicy`] then determines whether to retry based on failure type
//! and attempt count. Two backoff shapes are supported:
//!
//! - [`Backoff::Linear`]: `attempt * step`. Page fetches and PDF downloads use
//!   this with a 2 second step, so the waits are 2s, 4s, 6s, ...
//! - [`Backoff::Exponential`]: `min(base * multiplier^(attempt - 1), max) + jitter`.
//!   Used by the annotation pass when the classifier reports rate limiting.
//!
//! # Example
//!
//! ```
//! use papercrawl_core::download::{
//!     DownloadError, RetryPolicy, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/file.pdf", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::DownloadError;

/// Default maximum attempts per URL.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default linear backoff step (2 seconds).
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Default maximum delay cap for exponential backoff (32 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, 5xx server errors, connection refused.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 403 Forbidden, invalid URL, local IO errors.
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the request.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Shape of the wait between two attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Waits `attempt * step` after the given failed attempt.
    Linear {
        /// Delay unit multiplied by the failed attempt number.
        step: Duration,
    },

    /// Waits `min(base * multiplier^(attempt - 1), max)` plus random jitter.
    Exponential {
        /// Delay after the first failed attempt.
        base: Duration,
        /// Growth factor per attempt.
        multiplier: f32,
        /// Upper bound before jitter.
        max: Duration,
        /// Upper bound of the uniformly random jitter added to each delay.
        jitter: Duration,
    },
}

impl Backoff {
    /// Linear backoff with the given step.
    #[must_use]
    pub fn linear(step: Duration) -> Self {
        Self::Linear { step }
    }

    /// Doubling backoff from `base`, capped at 32 seconds, without jitter.
    #[must_use]
    pub fn exponential(base: Duration) -> Self {
        Self::Exponential {
            base,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max: DEFAULT_MAX_DELAY,
            jitter: Duration::ZERO,
        }
    }

    /// Delay to wait after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Linear { step } => step.saturating_mul(attempt.max(1)),
            Self::Exponential {
                base,
                multiplier,
                max,
                jitter,
            } => {
                let base_ms = base.as_millis() as f64;
                let exponent = f64::from(attempt.max(1) - 1);
                let delay_ms = base_ms * f64::from(*multiplier).powf(exponent);
                let capped_ms = delay_ms.min(max.as_millis() as f64);
                Duration::from_millis(capped_ms as u64) + random_jitter(*jitter)
            }
        }
    }
}

/// Generates random jitter between 0 and `max`.
fn random_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let mut rng = rand::thread_rng();
    let jitter_ms = rng.gen_range(0..=max.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}

/// Configuration for retry behavior.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `backoff`: linear, 2 second step (waits 2s then 4s)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Wait between attempts.
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            backoff: Backoff::linear(DEFAULT_BACKOFF_STEP),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using the default backoff.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the configured backoff.
    #[must_use]
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Delay before the next attempt after `attempt` failed, or `None` when
    /// the budget is spent. Ignores failure classification.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.backoff.delay_for(attempt))
    }

    /// Sum of all waits a permanently failing request goes through.
    ///
    /// For exponential backoff with jitter this is a lower bound.
    #[must_use]
    pub fn minimum_total_backoff(&self) -> Duration {
        let without_jitter = match &self.backoff {
            Backoff::Exponential {
                base,
                multiplier,
                max,
                ..
            } => Backoff::Exponential {
                base: *base,
                multiplier: *multiplier,
                max: *max,
                jitter: Duration::ZERO,
            },
            linear @ Backoff::Linear { .. } => linear.clone(),
        };
        (1..self.max_attempts)
            .map(|attempt| without_jitter.delay_for(attempt))
            .sum()
    }

    /// Determines whether to retry a failed request.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        let Some(delay) = self.next_delay(attempt) else {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        };

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Sleeps for `delay` unless `cancel` fires first. Returns `false` when cancelled.
pub(crate) async fn backoff_sleep(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = cancel.cancelled() => false,
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// # HTTP Status Code Classification
///
/// | Status | Type | Rationale |
/// |--------|------|-----------|
/// | 408 | Transient | Request timeout - may succeed |
/// | 429 | RateLimited | Rate limited - retry with backoff |
/// | 5xx | Transient | Server error - may be temporary |
/// | other 4xx | Permanent | Client error - won't change on retry |
///
/// # Non-HTTP Errors
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Network (most) | Transient |
/// | Network (TLS) | Permanent |
/// | IO | Permanent |
/// | InvalidUrl | Permanent |
/// | Cancelled | Permanent |
#[instrument]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),

        DownloadError::Timeout { .. } => FailureType::Transient,

        DownloadError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }

        DownloadError::Io { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::Cancelled { .. } => FailureType::Permanent,
    }
}

/// Classifies an HTTP status code into a failure type.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,   // Request Timeout
        429 => FailureType::RateLimited, // Too Many Requests
        status if (500..600).contains(&status) => FailureType::Transient,
        status if (400..500).contains(&status) => FailureType::Permanent,
        // 1xx/3xx/non-200 2xx reaching here were not followed or not usable
        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}
