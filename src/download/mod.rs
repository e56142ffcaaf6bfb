//! HTTP fetching and PDF downloading.
//!
//! This module provides the network side of the crawler:
//!
//! - [`HttpClient`] issues single GET requests with the configured
//!   User-Agent and per-attempt timeout.
//! - [`Fetcher`] retrieves HTML pages, retrying every failure with linear
//!   backoff and reporting exhaustion as "no page".
//! - [`Downloader`] persists PDFs under their artifact names, skipping
//!   targets that already exist and retrying only transient failures.
//!
//! # Example
//!
//! ```no_run
//! use papercrawl_core::download::{Downloader, HttpClient, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let downloader = Downloader::new(HttpClient::new(), RetryPolicy::default(), "./papers");
//! let outcome = downloader
//!     .download(
//!         "https://papers.nips.cc/paper_files/paper/2020/file/abc-Paper.pdf",
//!         "Some Paper.pdf",
//!         &CancellationToken::new(),
//!     )
//!     .await;
//! println!("{outcome:?}");
//! # }
//! ```

mod client;
pub mod constants;
mod downloader;
mod error;
mod fetcher;
mod filename;
mod retry;

pub use client::{HttpClient, SaveOutcome};
pub use downloader::{DownloadOutcome, Downloader};
pub use error::DownloadError;
pub use fetcher::Fetcher;
pub use filename::{ArtifactNaming, is_partial_file, sanitize_title, title_filename, url_filename};
pub use retry::{
    Backoff, DEFAULT_BACKOFF_STEP, DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};

pub(crate) use retry::backoff_sleep;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
