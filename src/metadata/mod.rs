//! Metadata CSV storage.
//!
//! The crawl records one [`PaperRecord`] per discovered paper through a
//! shared [`MetadataRecorder`]; the annotation pass reads the same file with
//! [`read_records`] and writes its own output through a [`CsvAppender`].
//!
//! Files are standard CSV (comma separated, RFC 4180 quoting,
//! newline-terminated rows) with the header as the first line.

mod appender;
mod error;
mod record;
mod recorder;

pub use appender::CsvAppender;
pub use error::MetadataError;
pub use record::{METADATA_HEADER, PaperRecord, read_records};
pub use recorder::{AppendOutcome, MetadataRecorder};
