//! Crawl counters.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters updated by concurrent crawl tasks.
#[derive(Debug, Default)]
pub struct CrawlStats {
    years: AtomicUsize,
    papers_seen: AtomicUsize,
    discovered: AtomicUsize,
    dropped: AtomicUsize,
    recorded: AtomicUsize,
    already_recorded: AtomicUsize,
    metadata_errors: AtomicUsize,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl CrawlStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn increment_years(&self) {
        self.years.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_already_recorded(&self) {
        self.already_recorded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_metadata_errors(&self) {
        self.metadata_errors.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_papers_seen(&self, count: usize) {
        self.papers_seen.fetch_add(count, Ordering::SeqCst);
    }

    /// Copies the current counts.
    #[must_use]
    pub fn snapshot(&self) -> CrawlSummary {
        CrawlSummary {
            years: self.years.load(Ordering::SeqCst),
            papers_seen: self.papers_seen.load(Ordering::SeqCst),
            discovered: self.discovered.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
            recorded: self.recorded.load(Ordering::SeqCst),
            already_recorded: self.already_recorded.load(Ordering::SeqCst),
            metadata_errors: self.metadata_errors.load(Ordering::SeqCst),
            downloaded: self.downloaded.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Final counts of a crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Year archives processed.
    pub years: usize,
    /// Paper entries found on year pages.
    pub papers_seen: usize,
    /// Papers with a PDF link and title.
    pub discovered: usize,
    /// Papers dropped: page unreachable, no PDF link, or no title.
    pub dropped: usize,
    /// New metadata rows written.
    pub recorded: usize,
    /// Papers whose row already existed.
    pub already_recorded: usize,
    /// Rows that could not be written.
    pub metadata_errors: usize,
    /// PDFs fetched and written.
    pub downloaded: usize,
    /// PDFs already on disk.
    pub skipped: usize,
    /// PDFs that could not be fetched.
    pub failed: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years, {} papers seen: {} discovered, {} recorded ({} already), \
             {} downloaded, {} skipped, {} failed, {} dropped",
            self.years,
            self.papers_seen,
            self.discovered,
            self.recorded,
            self.already_recorded,
            self.downloaded,
            self.skipped,
            self.failed,
            self.dropped,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        assert_eq!(CrawlStats::new().snapshot(), CrawlSummary::default());
    }

    #[test]
    fn test_increments_from_threads() {
        let stats = Arc::new(CrawlStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    stats.increment_downloaded();
                    stats.add_papers_seen(2);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = stats.snapshot();
        assert_eq!(summary.downloaded, 8);
        assert_eq!(summary.papers_seen, 16);
    }

    #[test]
    fn test_summary_display() {
        let summary = CrawlSummary {
            years: 2,
            papers_seen: 5,
            discovered: 4,
            dropped: 1,
            recorded: 3,
            already_recorded: 1,
            metadata_errors: 0,
            downloaded: 2,
            skipped: 1,
            failed: 1,
        };
        assert_eq!(
            summary.to_string(),
            "2 years, 5 papers seen: 4 discovered, 3 recorded (1 already), \
             2 downloaded, 1 skipped, 1 failed, 1 dropped"
        );
    }
}
