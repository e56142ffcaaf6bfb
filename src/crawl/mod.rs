//! Concurrent crawl of a proceedings site.
//!
//! The crawl walks three levels of links: the site root lists year archives,
//! each archive lists paper entries, and each paper page links its PDF. Every
//! paper with a PDF link and a title becomes a [`PaperDiscovery`], which is
//! recorded in the metadata CSV before its PDF is downloaded.
//!
//! # Example
//!
//! ```no_run
//! use papercrawl_core::config::CrawlConfig;
//! use papercrawl_core::crawl::CrawlOrchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = CrawlOrchestrator::new(&CrawlConfig::default()).await?;
//! let summary = orchestrator.run(&CancellationToken::new()).await;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

mod error;
mod orchestrator;
mod stats;
mod types;

pub use error::CrawlError;
pub use orchestrator::{CrawlOrchestrator, PaperOutcome};
pub use stats::{CrawlStats, CrawlSummary};
pub use types::{PaperDiscovery, YearArchive};
