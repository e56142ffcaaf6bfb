//! Error types for the annotation pass.

use thiserror::Error;

use crate::metadata::MetadataError;

/// Errors from a single classification request.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The service asked us to slow down (HTTP 429 / `RESOURCE_EXHAUSTED`).
    #[error("classifier rate limited: {message}")]
    RateLimited {
        /// Server message, if any
        message: String,
    },

    /// The service answered with another non-success status.
    #[error("classifier returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Server message, if any
        message: String,
    },

    /// The request did not complete.
    #[error("classifier request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// The response envelope could not be decoded.
    #[error("unexpected classifier response: {reason}")]
    InvalidResponse {
        /// What was wrong
        reason: String,
    },

    /// No API key is configured.
    #[error("missing API key: set the {var} environment variable")]
    MissingApiKey {
        /// Environment variable that was consulted
        var: &'static str,
    },
}

impl ClassifyError {
    /// Returns `true` for [`ClassifyError::RateLimited`].
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors that stop an annotation pass.
///
/// Per-title classification failures are recorded as `Error` rows instead.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// The metadata file could not be read.
    #[error("cannot read metadata input: {0}")]
    Input(#[source] MetadataError),

    /// The output file could not be written.
    #[error("cannot write annotation output: {0}")]
    Output(#[source] MetadataError),

    /// Concurrency must be at least 1.
    #[error("invalid annotation concurrency {value}: must be at least 1")]
    InvalidConcurrency {
        /// Rejected value
        value: usize,
    },
}
