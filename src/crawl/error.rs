//! Error type for crawl setup.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::metadata::MetadataError;

/// Errors that stop a crawl before it starts.
///
/// Failures during the crawl (unreachable pages, missing links, failed
/// downloads) are logged and counted, never returned.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Settings failed validation.
    #[error("invalid crawl configuration: {0}")]
    Config(#[from] ConfigError),

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built (TLS backend, bad User-Agent).
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The metadata file could not be opened.
    #[error("cannot open metadata store: {0}")]
    Metadata(#[from] MetadataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_dir_error_display() {
        let error = CrawlError::OutputDir {
            path: PathBuf::from("/readonly/papers"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            error.to_string(),
            "cannot create output directory /readonly/papers: denied"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let error: CrawlError = ConfigError::Syntax { line: 2 }.into();
        assert!(error.to_string().contains("line 2"));
    }
}
