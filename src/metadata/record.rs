//! The metadata row schema and reader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::MetadataError;

/// Header of the metadata CSV, in column order.
pub const METADATA_HEADER: &[&str] = &["year", "paper_url", "pdf_url", "title"];

/// One discovered paper: a row of the metadata CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Publication year parsed from the archive URL.
    pub year: i32,
    /// Abstract page URL (equals `pdf_url` for direct PDF entries).
    pub paper_url: String,
    /// Absolute PDF URL.
    pub pdf_url: String,
    /// Paper title.
    pub title: String,
}

/// Reads every row of a metadata CSV.
///
/// Rows that fail to decode are logged and skipped.
///
/// # Errors
///
/// Returns [`MetadataError::Io`] if the file cannot be read, or
/// [`MetadataError::Csv`] if the header row itself is unreadable.
pub async fn read_records(path: &Path) -> Result<Vec<PaperRecord>, MetadataError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MetadataError::io(path, e))?;
    decode_records(path, &bytes)
}

pub(crate) fn decode_records(path: &Path, bytes: &[u8]) -> Result<Vec<PaperRecord>, MetadataError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .headers()
        .map_err(|e| MetadataError::csv(path, e))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<PaperRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                path = %path.display(),
                row = index + 1,
                error = %e,
                "skipping malformed metadata row"
            ),
        }
    }
    Ok(records)
}
