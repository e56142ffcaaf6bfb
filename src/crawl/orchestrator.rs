//! Crawl orchestrator: site root, year archives, paper pages, PDFs.
//!
//! # Concurrency Model
//!
//! - Every year archive runs in its own Tokio task; there is no limit on how
//!   many years are in flight.
//! - Every paper entry runs in its own Tokio task. Before doing any network
//!   work the task acquires a permit from the shared admission semaphore, so
//!   at most `concurrency_limit` papers are fetched, recorded, or downloaded
//!   at once.
//! - Permits are released automatically when the task ends (RAII).
//! - A cancellation token reaches every task. Once it fires, no new fetch
//!   starts, backoff sleeps and permit waits end early, and the crawl
//!   returns whatever it counted so far.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::CrawlError;
use super::stats::{CrawlStats, CrawlSummary};
use super::types::{PaperDiscovery, YearArchive};
use crate::config::{ConfigError, CrawlConfig};
use crate::download::{ArtifactNaming, DownloadError, DownloadOutcome, Downloader, Fetcher, HttpClient};
use crate::metadata::{AppendOutcome, MetadataRecorder};
use crate::parser::{PaperEntry, PaperPage, archive_links, is_paper_pdf_url, paper_entries};

/// What happened to one paper entry.
#[derive(Debug)]
pub enum PaperOutcome {
    /// The paper produced no discovery.
    Dropped {
        /// Why it was dropped.
        reason: &'static str,
    },
    /// Cancellation arrived before the paper finished.
    Cancelled,
    /// The paper was recorded (or found recorded) and its download attempted.
    Completed {
        /// The discovery that was recorded.
        discovery: PaperDiscovery,
        /// Download result.
        download: DownloadOutcome,
    },
}

#[derive(Debug)]
struct CrawlContext {
    base_url: Url,
    fetcher: Fetcher,
    downloader: Downloader,
    recorder: MetadataRecorder,
    gate: Arc<Semaphore>,
    concurrency: usize,
    naming: ArtifactNaming,
    stats: CrawlStats,
}

/// Drives a full crawl of one proceedings site.
///
/// Cheap to clone; clones share the admission gate, the recorder, and the
/// counters.
#[derive(Debug, Clone)]
pub struct CrawlOrchestrator {
    inner: Arc<CrawlContext>,
}

impl CrawlOrchestrator {
    /// Validates `config`, creates the output directory, and opens the
    /// metadata store.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] if the configuration is invalid, the output
    /// directory cannot be created, the HTTP client cannot be built, or the
    /// metadata file cannot be read.
    #[instrument(skip(config), fields(base_url = %config.base_url, output_dir = %config.output_dir.display()))]
    pub async fn new(config: &CrawlConfig) -> Result<Self, CrawlError> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            url: config.base_url.clone(),
        })?;

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|source| CrawlError::OutputDir {
                path: config.output_dir.clone(),
                source,
            })?;

        let client = HttpClient::with_settings(&config.user_agent, config.timeout)
            .map_err(CrawlError::HttpClient)?;
        let policy = config.retry_policy();
        let recorder = MetadataRecorder::open(config.metadata_path()).await?;

        debug!(
            concurrency = config.concurrency_limit,
            max_retries = policy.max_attempts(),
            timeout_secs = config.timeout.as_secs(),
            naming = config.artifact_naming.as_str(),
            "creating crawl orchestrator"
        );

        Ok(Self {
            inner: Arc::new(CrawlContext {
                base_url,
                fetcher: Fetcher::new(client.clone(), policy.clone()),
                downloader: Downloader::new(client, policy, config.output_dir.clone()),
                recorder,
                gate: Arc::new(Semaphore::new(config.concurrency_limit)),
                concurrency: config.concurrency_limit,
                naming: config.artifact_naming,
                stats: CrawlStats::new(),
            }),
        })
    }

    /// Returns the paper concurrency ceiling.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Returns the metadata recorder shared by all paper tasks.
    #[must_use]
    pub fn recorder(&self) -> &MetadataRecorder {
        &self.inner.recorder
    }

    /// Returns the counts accumulated so far.
    #[must_use]
    pub fn summary(&self) -> CrawlSummary {
        self.inner.stats.snapshot()
    }

    /// Crawls the whole site.
    ///
    /// An unreachable root ends the crawl successfully with nothing done.
    /// Individual failures below the root are logged and counted, never
    /// returned.
    #[instrument(skip(self, cancel), fields(base_url = %self.inner.base_url))]
    pub async fn run(&self, cancel: &CancellationToken) -> CrawlSummary {
        info!("starting crawl");

        let Some(body) = self.inner.fetcher.fetch(self.inner.base_url.as_str(), cancel).await else {
            warn!(url = %self.inner.base_url, "site root unreachable, nothing to crawl");
            return self.summary();
        };

        let links = archive_links(&body, &self.inner.base_url);
        if links.is_empty() {
            info!("no archive links on site root");
        }

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        for link in &links {
            if cancel.is_cancelled() {
                info!("cancelled, not starting remaining years");
                break;
            }
            let Some(archive) = YearArchive::from_link(link) else {
                warn!(url = %link.url, "archive link has no parseable year, skipping");
                continue;
            };

            self.inner.stats.increment_years();
            let orchestrator = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.process_year(&archive, &cancel).await;
            }));
        }

        debug!(year_count = handles.len(), "waiting for year tasks");
        await_all(handles, "year task panicked").await;

        let summary = self.summary();
        info!(
            years = summary.years,
            discovered = summary.discovered,
            recorded = summary.recorded,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            dropped = summary.dropped,
            "crawl complete"
        );
        summary
    }

    /// Processes one year archive: fetches it, then runs every paper entry
    /// concurrently and waits for all of them.
    ///
    /// Returns the number of paper entries found.
    #[instrument(skip(self, cancel), fields(year = archive.year, url = %archive.url))]
    pub async fn process_year(&self, archive: &YearArchive, cancel: &CancellationToken) -> usize {
        let Some(body) = self.inner.fetcher.fetch(&archive.url, cancel).await else {
            return 0;
        };

        let entries = paper_entries(&body, &self.inner.base_url);
        if entries.is_empty() {
            info!(year = archive.year, "no paper entries on archive page");
            return 0;
        }
        self.inner.stats.add_papers_seen(entries.len());
        info!(year = archive.year, papers = entries.len(), "processing year");

        let count = entries.len();
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(count);
        for entry in entries {
            if cancel.is_cancelled() {
                break;
            }
            let orchestrator = self.clone();
            let cancel = cancel.clone();
            let year = archive.year;
            handles.push(tokio::spawn(async move {
                orchestrator.process_paper(&entry, year, &cancel).await;
            }));
        }

        await_all(handles, "paper task panicked").await;
        count
    }

    /// Processes one paper entry under an admission permit.
    ///
    /// Resolves the PDF link and title, records the metadata row, then
    /// downloads the PDF. A paper page that is unreachable, has no PDF link,
    /// or has no title is dropped, as is a direct link whose URL is not a
    /// `Paper.pdf` or `Paper-Conference.pdf`.
    #[instrument(skip(self, entry, cancel), fields(url = %entry.link().url))]
    pub async fn process_paper(
        &self,
        entry: &PaperEntry,
        year: i32,
        cancel: &CancellationToken,
    ) -> PaperOutcome {
        let gate = Arc::clone(&self.inner.gate);
        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return PaperOutcome::Cancelled,
            permit = gate.acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("admission gate closed");
                    return PaperOutcome::Cancelled;
                }
            },
        };

        let discovery = match self.discover(entry, year, cancel).await {
            Ok(discovery) => discovery,
            Err(outcome) => return outcome,
        };
        self.inner.stats.increment_discovered();

        match self.inner.recorder.append(&discovery.to_record()).await {
            Ok(AppendOutcome::Appended) => self.inner.stats.increment_recorded(),
            Ok(AppendOutcome::AlreadyRecorded) => self.inner.stats.increment_already_recorded(),
            Err(e) => {
                warn!(paper_url = %discovery.paper_url, error = %e, "failed to record metadata");
                self.inner.stats.increment_metadata_errors();
            }
        }

        let filename = self
            .inner
            .naming
            .artifact_filename(&discovery.title, &discovery.pdf_url);
        let download = self
            .inner
            .downloader
            .download(&discovery.pdf_url, &filename, cancel)
            .await;

        match &download {
            DownloadOutcome::Persisted { .. } => self.inner.stats.increment_downloaded(),
            DownloadOutcome::Skipped { .. } => self.inner.stats.increment_skipped(),
            DownloadOutcome::Failed {
                error: DownloadError::Cancelled { .. },
                ..
            } => return PaperOutcome::Cancelled,
            DownloadOutcome::Failed { .. } => self.inner.stats.increment_failed(),
        }

        PaperOutcome::Completed {
            discovery,
            download,
        }
    }

    async fn discover(
        &self,
        entry: &PaperEntry,
        year: i32,
        cancel: &CancellationToken,
    ) -> Result<PaperDiscovery, PaperOutcome> {
        match entry {
            PaperEntry::DirectPdf(link) => {
                if !is_paper_pdf_url(&link.url) {
                    return Err(self.dropped("direct link is not a paper PDF"));
                }
                if link.text.is_empty() {
                    return Err(self.dropped("direct PDF link has no text"));
                }
                Ok(PaperDiscovery {
                    year,
                    paper_url: link.url.clone(),
                    pdf_url: link.url.clone(),
                    title: link.text.clone(),
                })
            }
            PaperEntry::Page(link) => {
                let Some(body) = self.inner.fetcher.fetch(&link.url, cancel).await else {
                    if cancel.is_cancelled() {
                        return Err(PaperOutcome::Cancelled);
                    }
                    return Err(self.dropped("paper page unreachable"));
                };

                let page = PaperPage::parse(&body, &self.inner.base_url);
                let Some(pdf) = page.pdf else {
                    return Err(self.dropped("no PDF link on paper page"));
                };
                let Some(title) = page.title else {
                    return Err(self.dropped("no title on paper page"));
                };

                Ok(PaperDiscovery {
                    year,
                    paper_url: link.url.clone(),
                    pdf_url: pdf.url,
                    title,
                })
            }
        }
    }

    fn dropped(&self, reason: &'static str) -> PaperOutcome {
        debug!(reason, "paper dropped");
        self.inner.stats.increment_dropped();
        PaperOutcome::Dropped { reason }
    }
}

async fn await_all(handles: Vec<JoinHandle<()>>, panic_message: &'static str) {
    for handle in handles {
        // Ignore JoinError - task panics are logged but don't fail the crawl
        if let Err(e) = handle.await {
            warn!(error = %e, "{panic_message}");
        }
    }
}
