//! Top-level run: config, logging, interrupt handling, and the chosen command.

use std::sync::Arc;

use anyhow::{Context, Result};
use papercrawl_core::annotate::{Annotator, GeminiClassifier};
use papercrawl_core::config::{FileConfig, load_file_config};
use papercrawl_core::crawl::CrawlOrchestrator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config_runtime, terminal};
use crate::cli::{AnnotateArgs, Command, CrawlArgs};

pub(crate) async fn run_papercrawl() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();

    let loaded = load_file_config(cli.config.as_deref()).context("Failed to load config file")?;
    let file_config = loaded.config.as_ref();

    let default_level =
        config_runtime::resolve_default_log_level(&cli, &cli_sources, file_config);
    terminal::init_tracing(
        default_level,
        config_runtime::should_force_cli_log_level(&cli_sources),
    );
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), found = file_config.is_some(), "Config file");
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight work");
            interrupt.cancel();
        }
    });

    match cli.command_or_default() {
        Command::Crawl(args) => run_crawl(&args, file_config, &cancel).await?,
        Command::Annotate(args) => run_annotate(&args, file_config, &cancel).await?,
    }

    if cancel.is_cancelled() {
        warn!("Interrupted. Run again to resume; existing files are skipped.");
        return Ok(ProcessExit::Interrupted);
    }
    Ok(ProcessExit::Success)
}

async fn run_crawl(
    args: &CrawlArgs,
    file_config: Option<&FileConfig>,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = config_runtime::resolve_crawl_config(args, file_config)?;
    info!(
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        concurrency = config.concurrency_limit,
        "Papercrawl starting"
    );

    let orchestrator = CrawlOrchestrator::new(&config).await?;
    let summary = orchestrator.run(cancel).await;

    info!(%summary, "Crawl complete");
    if summary.metadata_errors > 0 {
        warn!(
            count = summary.metadata_errors,
            path = %config.metadata_path().display(),
            "Some metadata rows could not be written"
        );
    }
    Ok(())
}

async fn run_annotate(
    args: &AnnotateArgs,
    file_config: Option<&FileConfig>,
    cancel: &CancellationToken,
) -> Result<()> {
    let paths = config_runtime::resolve_annotate_paths(args, file_config);
    let classifier = GeminiClassifier::from_env(args.model.clone())?;
    let annotator = Annotator::new(Arc::new(classifier), usize::from(args.threads))?;

    info!(
        input = %paths.input.display(),
        output = %paths.output.display(),
        model = %args.model,
        "Annotation starting"
    );
    let summary = annotator
        .annotate_file(&paths.input, &paths.output, cancel)
        .await?;

    info!(
        total = summary.total,
        classified = summary.classified,
        unknown = summary.unknown,
        errors = summary.errors,
        "Annotation complete"
    );
    if summary.write_errors > 0 {
        warn!(count = summary.write_errors, "Some annotation rows could not be written");
    }
    Ok(())
}
