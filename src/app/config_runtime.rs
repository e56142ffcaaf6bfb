//! Merges command-line flags over the config file and built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use papercrawl_core::config::{CrawlConfig, FileConfig};
use papercrawl_core::download::ArtifactNaming;

use crate::cli::{AnnotateArgs, Cli, CrawlArgs, DEFAULT_ANNOTATED_FILE};

/// Which global flags were typed on the command line (as opposed to
/// defaulted).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (cli, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    // Global flags given after a subcommand are recorded on the subcommand.
    let sub = matches.subcommand().map(|(_, sub)| sub);
    let typed = |id: &str| {
        is_commandline_value(matches, id) || sub.is_some_and(|m| is_commandline_value(m, id))
    };
    CliValueSources {
        verbose: typed("verbose"),
        quiet: typed("quiet"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Builds the effective crawl settings: defaults, then the config file, then
/// flags.
pub(crate) fn resolve_crawl_config(
    args: &CrawlArgs,
    file_config: Option<&FileConfig>,
) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::default();
    if let Some(file_config) = file_config {
        file_config.apply_to(&mut config);
    }

    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir.clone_from(output_dir);
    }
    if let Some(metadata_file) = &args.metadata_file {
        config.metadata_file.clone_from(metadata_file);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency_limit = usize::from(concurrency);
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = u32::from(max_retries);
    }
    if let Some(timeout) = args.timeout {
        config.timeout = Duration::from_secs(timeout);
    }
    if let Some(step_ms) = args.backoff_step_ms {
        config.backoff_step = Duration::from_millis(step_ms);
    }
    if let Some(user_agent) = &args.user_agent {
        config.user_agent.clone_from(user_agent);
    }
    if args.name_by_url {
        config.artifact_naming = ArtifactNaming::Url;
    }

    config
        .validate()
        .context("Invalid effective crawl configuration")?;
    Ok(config)
}

/// Input and output paths of an annotation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnnotatePaths {
    pub(crate) input: PathBuf,
    pub(crate) output: PathBuf,
}

/// Input defaults to the crawl's metadata file; output defaults to
/// `annotated_metadata.csv` beside the input.
pub(crate) fn resolve_annotate_paths(
    args: &AnnotateArgs,
    file_config: Option<&FileConfig>,
) -> AnnotatePaths {
    let input = args.input.clone().unwrap_or_else(|| {
        let mut config = CrawlConfig::default();
        if let Some(file_config) = file_config {
            file_config.apply_to(&mut config);
        }
        config.metadata_path()
    });
    let output = args.output.clone().unwrap_or_else(|| {
        input
            .parent()
            .map_or_else(|| PathBuf::from(DEFAULT_ANNOTATED_FILE), |dir| {
                dir.join(DEFAULT_ANNOTATED_FILE)
            })
    });
    AnnotatePaths { input, output }
}

/// Default log level when `RUST_LOG` does not decide.
///
/// Priority: `-q` > `-v` count > config verbosity > `info`.
pub(crate) fn resolve_default_log_level(
    cli: &Cli,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> &'static str {
    if cli.quiet {
        return "error";
    }
    if cli.verbose > 0 {
        return if cli.verbose == 1 { "debug" } else { "trace" };
    }
    if !cli_sources.verbose
        && !cli_sources.quiet
        && let Some(verbosity) = file_config.and_then(|c| c.verbosity)
    {
        return verbosity.log_level();
    }
    "info"
}

/// A level typed on the command line overrides `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}
