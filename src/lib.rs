//! Papercrawl Core Library
//!
//! This library crawls a conference proceedings site, records one metadata
//! row per paper, and downloads each paper's PDF. A separate pass can enrich
//! the recorded titles with a research category and authors.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Crawl settings, config file parsing, validation
//! - [`crawl`] - Year and paper fan-out under a shared admission gate
//! - [`download`] - HTTP client, retrying page fetcher, idempotent PDF downloader
//! - [`parser`] - Link extraction from proceedings pages and year parsing
//! - [`metadata`] - Serialized CSV recording and reading
//! - [`annotate`] - Title classification into `title,Category,Authors` rows

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod annotate;
pub mod config;
pub mod crawl;
pub mod download;
pub mod metadata;
pub mod parser;
pub mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{CrawlConfig, FileConfig, LoadedConfig, load_file_config};
pub use crawl::{CrawlError, CrawlOrchestrator, CrawlSummary};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadError, DownloadOutcome, Downloader, Fetcher, HttpClient,
    RetryPolicy,
};
pub use metadata::{MetadataRecorder, PaperRecord};
pub use parser::{Link, PaperEntry, PaperPage, extract_links, parse_year};
