//! Header-once CSV appending.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::error::MetadataError;

/// Appends serialized rows to one CSV file, writing `header` first when the
/// file is missing or empty.
///
/// Methods take `&mut self`: callers sharing an appender across tasks wrap it
/// in a mutex, which makes "check header, maybe write header, append row" a
/// single critical section.
#[derive(Debug)]
pub struct CsvAppender {
    path: PathBuf,
    header: &'static [&'static str],
}

impl CsvAppender {
    /// Creates an appender for `path`. Nothing is touched on disk yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }

    /// Path of the CSV file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates the file and writes only the header.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the header cannot be encoded or written.
    pub async fn reset(&mut self) -> Result<(), MetadataError> {
        let bytes = self.encode::<()>(true, None)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| MetadataError::io(self.path.clone(), e))
    }

    /// Appends one row, preceded by the header if the file has no content.
    ///
    /// The header and row go out in a single write so a reader never sees a
    /// partial row from this call.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the row cannot be encoded or the file
    /// cannot be opened or written.
    pub async fn append<R: Serialize>(&mut self, record: &R) -> Result<(), MetadataError> {
        let needs_header = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(MetadataError::io(self.path.clone(), e)),
        };

        let bytes = self.encode(needs_header, Some(record))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MetadataError::io(self.path.clone(), e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| MetadataError::io(self.path.clone(), e))?;
        file.flush()
            .await
            .map_err(|e| MetadataError::io(self.path.clone(), e))
    }

    fn encode<R: Serialize>(
        &self,
        with_header: bool,
        record: Option<&R>,
    ) -> Result<Vec<u8>, MetadataError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        if with_header {
            writer
                .write_record(self.header)
                .map_err(|e| MetadataError::csv(self.path.clone(), e))?;
        }
        if let Some(record) = record {
            writer
                .serialize(record)
                .map_err(|e| MetadataError::csv(self.path.clone(), e))?;
        }

        writer
            .into_inner()
            .map_err(|e| MetadataError::io(self.path.clone(), e.into_error()))
    }
}
