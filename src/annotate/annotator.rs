//! Concurrent annotation of a metadata CSV.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{AnnotateError, Classification, Classifier, ERROR, UNKNOWN};
use crate::download::{Backoff, RetryPolicy, backoff_sleep};
use crate::metadata::{CsvAppender, read_records};

/// Header of the annotation CSV, in column order.
pub const ANNOTATION_HEADER: &[&str] = &["title", "Category", "Authors"];

/// Parallel classification requests unless configured otherwise.
pub const DEFAULT_ANNOTATE_CONCURRENCY: usize = 5;

const RATE_LIMIT_ATTEMPTS: u32 = 3;
const RATE_LIMIT_BASE_DELAY: Duration = Duration::from_secs(10);

/// One row of the annotation CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    /// Paper title copied from the metadata file.
    pub title: String,
    /// Assigned category.
    #[serde(rename = "Category")]
    pub category: String,
    /// Guessed authors.
    #[serde(rename = "Authors")]
    pub authors: String,
}

/// Counts from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    /// Rows read from the metadata file.
    pub total: usize,
    /// Rows with a category from the known list.
    pub classified: usize,
    /// Rows labelled `Unknown`.
    pub unknown: usize,
    /// Rows labelled `Error`.
    pub errors: usize,
    /// Rows that could not be appended to the output.
    pub write_errors: usize,
    /// Titles skipped because the pass was cancelled.
    pub cancelled: usize,
}

impl AnnotateSummary {
    fn count(&mut self, classification: &Classification) {
        match classification.category.as_str() {
            ERROR => self.errors += 1,
            UNKNOWN => self.unknown += 1,
            _ => self.classified += 1,
        }
    }
}

/// Classifies titles with bounded parallelism and rate-limit backoff.
#[derive(Clone)]
pub struct Annotator {
    classifier: Arc<dyn Classifier>,
    concurrency: usize,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("classifier", &self.classifier.name())
            .field("concurrency", &self.concurrency)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Annotator {
    /// Creates an annotator running up to `concurrency` requests at once.
    ///
    /// Rate-limited requests are attempted 3 times, waiting 10s then 20s.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotateError::InvalidConcurrency`] if `concurrency` is 0.
    pub fn new(classifier: Arc<dyn Classifier>, concurrency: usize) -> Result<Self, AnnotateError> {
        if concurrency == 0 {
            return Err(AnnotateError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            classifier,
            concurrency,
            policy: RetryPolicy::new(
                RATE_LIMIT_ATTEMPTS,
                Backoff::exponential(RATE_LIMIT_BASE_DELAY),
            ),
        })
    }

    /// Replaces the rate-limit retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Maximum parallel classification requests.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Classifies one title.
    ///
    /// Only rate limiting is retried. Any other failure, an exhausted retry
    /// budget, or cancellation during a wait yields
    /// [`Classification::error`].
    #[instrument(skip(self, cancel), fields(classifier = self.classifier.name()))]
    pub async fn annotate_title(&self, title: &str, cancel: &CancellationToken) -> Classification {
        let mut attempt = 1;
        loop {
            match self.classifier.classify(title).await {
                Ok(classification) => return classification,
                Err(error) if error.is_rate_limited() => {
                    let Some(delay) = self.policy.next_delay(attempt) else {
                        warn!(attempts = attempt, "rate limit retries exhausted");
                        return Classification::error();
                    };
                    warn!(attempt, delay_ms = delay.as_millis(), "rate limited, backing off");
                    if !backoff_sleep(delay, cancel).await {
                        return Classification::error();
                    }
                    attempt += 1;
                }
                Err(error) => {
                    warn!(error = %error, "classification failed");
                    return Classification::error();
                }
            }
        }
    }

    /// Classifies every title in the metadata CSV at `input` and writes
    /// `title,Category,Authors` rows to `output`.
    ///
    /// The output is truncated first; rows are appended in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotateError::Input`] if the metadata file cannot be read,
    /// or [`AnnotateError::Output`] if the output cannot be created.
    #[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
    pub async fn annotate_file(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<AnnotateSummary, AnnotateError> {
        let records = read_records(input).await.map_err(AnnotateError::Input)?;

        let mut appender = CsvAppender::new(output, ANNOTATION_HEADER);
        appender.reset().await.map_err(AnnotateError::Output)?;
        let appender = Arc::new(Mutex::new(appender));
        let gate = Arc::new(Semaphore::new(self.concurrency));

        info!(titles = records.len(), concurrency = self.concurrency, "annotating");

        let mut summary = AnnotateSummary {
            total: records.len(),
            ..AnnotateSummary::default()
        };

        let mut handles: Vec<JoinHandle<TitleOutcome>> = Vec::with_capacity(records.len());
        for record in records {
            let annotator = self.clone();
            let gate = Arc::clone(&gate);
            let appender = Arc::clone(&appender);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return TitleOutcome::Cancelled,
                    permit = gate.acquire_owned() => permit,
                };
                let Ok(_permit) = permit else {
                    return TitleOutcome::Cancelled;
                };

                let classification = annotator.annotate_title(&record.title, &cancel).await;
                let row = AnnotationRow {
                    title: record.title,
                    category: classification.category.clone(),
                    authors: classification.authors.clone(),
                };
                match appender.lock().await.append(&row).await {
                    Ok(()) => {
                        debug!(title = %row.title, category = %row.category, "annotated");
                        TitleOutcome::Written(classification)
                    }
                    Err(error) => {
                        warn!(title = %row.title, error = %error, "failed to append annotation");
                        TitleOutcome::WriteFailed(classification)
                    }
                }
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(TitleOutcome::Written(classification)) => summary.count(&classification),
                Ok(TitleOutcome::WriteFailed(classification)) => {
                    summary.count(&classification);
                    summary.write_errors += 1;
                }
                Ok(TitleOutcome::Cancelled) => summary.cancelled += 1,
                Err(e) => warn!(error = %e, "annotation task panicked"),
            }
        }

        info!(
            classified = summary.classified,
            unknown = summary.unknown,
            errors = summary.errors,
            "annotation finished"
        );
        Ok(summary)
    }
}

enum TitleOutcome {
    Written(Classification),
    WriteFailed(Classification),
    Cancelled,
}
