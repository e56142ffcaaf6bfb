//! Error types for metadata storage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or appending metadata CSV files.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Filesystem failure on the metadata file or its directory.
    #[error("metadata IO error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failure.
    #[error("metadata CSV error in {path}: {source}")]
    Csv {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: csv::Error,
    },
}

impl MetadataError {
    /// Creates an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV error.
    #[must_use]
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let error = MetadataError::io(
            "/tmp/out/metadata.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = error.to_string();
        assert!(message.contains("/tmp/out/metadata.csv"));
        assert!(message.contains("denied"));
    }
}
