//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use papercrawl_core::annotate::{DEFAULT_ANNOTATE_CONCURRENCY, DEFAULT_MODEL};

/// Annotation output file name, next to the metadata file.
pub const DEFAULT_ANNOTATED_FILE: &str = "annotated_metadata.csv";

/// Crawl a conference proceedings site and download its papers.
///
/// Without a subcommand, `papercrawl` runs `crawl` with settings from the
/// config file and built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "papercrawl")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Read settings from FILE instead of the default config path
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Discover papers, record metadata, and download PDFs
    Crawl(CrawlArgs),
    /// Classify recorded titles into research categories
    Annotate(AnnotateArgs),
}

/// Crawl overrides. Unset flags fall back to the config file, then defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    /// Proceedings site root
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory PDFs are written to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Metadata CSV path (relative paths are inside the output directory)
    #[arg(long, value_name = "FILE")]
    pub metadata_file: Option<PathBuf>,

    /// Maximum papers processed concurrently (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Attempts per page fetch and download (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Per-attempt request timeout in seconds (1-3600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Linear backoff step between attempts in milliseconds (0-60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    pub backoff_step_ms: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Name PDFs after the last URL segment instead of the title
    #[arg(long)]
    pub name_by_url: bool,
}

/// Annotation settings.
#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    /// Metadata CSV to read (default: the crawl's metadata file)
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Annotation CSV to write (default: annotated_metadata.csv next to the input)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Parallel classification requests (1-50)
    #[arg(short = 'j', long, default_value_t = DEFAULT_ANNOTATE_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub threads: u8,

    /// Gemini model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
}

impl Cli {
    /// The crawl arguments when no subcommand was given.
    #[must_use]
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Crawl(CrawlArgs::default()))
    }
}
