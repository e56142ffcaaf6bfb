//! Concurrent-safe metadata recorder.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::appender::CsvAppender;
use super::error::MetadataError;
use super::record::{METADATA_HEADER, PaperRecord, decode_records};

/// Result of [`MetadataRecorder::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new row was written.
    Appended,
    /// A row with the same `paper_url` already exists; nothing was written.
    AlreadyRecorded,
}

#[derive(Debug)]
struct RecorderState {
    appender: CsvAppender,
    known: HashSet<String>,
}

/// Appends [`PaperRecord`]s to the metadata CSV from any number of tasks.
///
/// Clones share one lock and one set of known papers. Each append is a single
/// critical section covering the duplicate check, the header check, and the
/// row write.
#[derive(Debug, Clone)]
pub struct MetadataRecorder {
    path: PathBuf,
    state: Arc<Mutex<RecorderState>>,
}

impl MetadataRecorder {
    /// Opens the recorder, loading `paper_url`s already present in `path`.
    ///
    /// A missing file is fine; it is created with its header on first append.
    /// The parent directory is created if needed.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the parent directory cannot be created or
    /// an existing file cannot be read.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MetadataError::io(parent, e))?;
        }

        let known: HashSet<String> = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_records(&path, &bytes)?
                .into_iter()
                .map(|record| record.paper_url)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(MetadataError::io(path, e)),
        };

        if !known.is_empty() {
            info!(existing = known.len(), "loaded existing metadata rows");
        }

        Ok(Self {
            state: Arc::new(Mutex::new(RecorderState {
                appender: CsvAppender::new(path.clone(), METADATA_HEADER),
                known,
            })),
            path,
        })
    }

    /// Path of the metadata CSV.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` unless its `paper_url` has been recorded before.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] if the row cannot be written. The record is
    /// not marked as known in that case.
    pub async fn append(&self, record: &PaperRecord) -> Result<AppendOutcome, MetadataError> {
        let mut state = self.state.lock().await;

        if state.known.contains(&record.paper_url) {
            debug!(paper_url = %record.paper_url, "paper already recorded");
            return Ok(AppendOutcome::AlreadyRecorded);
        }

        state.appender.append(record).await?;
        state.known.insert(record.paper_url.clone());
        debug!(paper_url = %record.paper_url, year = record.year, "metadata recorded");
        Ok(AppendOutcome::Appended)
    }

    /// Number of distinct papers in the file, including ones loaded at open.
    pub async fn recorded_count(&self) -> usize {
        self.state.lock().await.known.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(n: u32) -> PaperRecord {
        PaperRecord {
            year: 2020,
            paper_url: format!("https://papers.nips.cc/paper/{n}-Abstract.html"),
            pdf_url: format!("https://papers.nips.cc/paper/{n}-Paper.pdf"),
            title: format!("Paper {n}"),
        }
    }

    #[tokio::test]
    async fn test_append_writes_header_and_row() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.csv");
        let recorder = MetadataRecorder::open(&path).await.unwrap();

        let outcome = recorder.append(&record(1)).await.unwrap();

        assert_eq!(outcome, AppendOutcome::Appended);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "year,paper_url,pdf_url,title\n\
             2020,https://papers.nips.cc/paper/1-Abstract.html,https://papers.nips.cc/paper/1-Paper.pdf,Paper 1\n"
        );
    }

    #[tokio::test]
    async fn test_duplicate_paper_url_not_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.csv");
        let recorder = MetadataRecorder::open(&path).await.unwrap();

        recorder.append(&record(1)).await.unwrap();
        let second = recorder.append(&record(1)).await.unwrap();

        assert_eq!(second, AppendOutcome::AlreadyRecorded);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
        assert_eq!(recorder.recorded_count().await, 1);
    }

    #[tokio::test]
    async fn test_reopen_remembers_existing_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metadata.csv");
        {
            let recorder = MetadataRecorder::open(&path).await.unwrap();
            recorder.append(&record(1)).await.unwrap();
            recorder.append(&record(2)).await.unwrap();
        }

        let reopened = MetadataRecorder::open(&path).await.unwrap();
        assert_eq!(reopened.recorded_count().await, 2);
        assert_eq!(
            reopened.append(&record(2)).await.unwrap(),
            AppendOutcome::AlreadyRecorded
        );
        assert_eq!(
            reopened.append(&record(3)).await.unwrap(),
            AppendOutcome::Appended
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("year,paper_url").count(), 1);
        assert_eq!(content.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/metadata.csv");
        let recorder = MetadataRecorder::open(&path).await.unwrap();
        recorder.append(&record(7)).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let temp_dir = TempDir::new().unwrap();
        let recorder = MetadataRecorder::open(temp_dir.path().join("m.csv"))
            .await
            .unwrap();
        let clone = recorder.clone();

        recorder.append(&record(1)).await.unwrap();
        assert_eq!(
            clone.append(&record(1)).await.unwrap(),
            AppendOutcome::AlreadyRecorded
        );
    }
}
