//! Crawl configuration: defaults, the config file, and validation.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. [`CrawlConfig::default`]
//! 2. the config file ([`FileConfig`]), `key = value` lines with `#` comments
//! 3. command-line flags (applied by the binary)
//!
//! The default config file lives at
//! `$XDG_CONFIG_HOME/papercrawl/config.toml`, falling back to
//! `$HOME/.config/papercrawl/config.toml`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::download::{ArtifactNaming, Backoff, DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::user_agent::DEFAULT_USER_AGENT;

/// Proceedings site crawled by default.
pub const DEFAULT_BASE_URL: &str = "https://papers.nips.cc";

/// Directory artifacts are written to by default.
pub const DEFAULT_OUTPUT_DIR: &str = "papers";

/// Metadata file name, relative to the output directory.
pub const DEFAULT_METADATA_FILE: &str = "metadata.csv";

/// Default ceiling on concurrently processed papers.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default per-attempt request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default linear backoff step in milliseconds.
pub const DEFAULT_BACKOFF_STEP_MS: u64 = 2_000;

const CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=100;
const MAX_RETRIES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=3600;
const BACKOFF_STEP_MAX_MS: u64 = 60_000;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but cannot be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A line is not of the form `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax {
        /// 1-based line number
        line: usize,
    },

    /// The key is not a recognised setting.
    #[error("unknown configuration key: '{key}' on line {line}")]
    UnknownKey {
        /// The offending key
        key: String,
        /// 1-based line number
        line: usize,
    },

    /// The value does not have the expected type or form.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        /// Setting name
        key: &'static str,
        /// 1-based line number
        line: usize,
        /// What was expected
        reason: String,
    },

    /// A numeric setting is outside its allowed range.
    #[error("invalid config value for `{key}`: {value}. Expected range: {range}")]
    OutOfRange {
        /// Setting name
        key: &'static str,
        /// Rejected value
        value: u64,
        /// Allowed range, for display
        range: &'static str,
    },

    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base_url '{url}': expected an absolute http:// or https:// URL")]
    InvalidBaseUrl {
        /// Rejected URL
        url: String,
    },
}

/// Fully resolved crawl settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Site root; archive links are discovered here.
    pub base_url: String,
    /// Directory for downloaded PDFs.
    pub output_dir: PathBuf,
    /// Metadata CSV path; relative paths live under `output_dir`.
    pub metadata_file: PathBuf,
    /// Maximum papers processed at once.
    pub concurrency_limit: usize,
    /// Attempts per page fetch and per download.
    pub max_retries: u32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Linear backoff step between attempts.
    pub backoff_step: Duration,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// How artifact files are named.
    pub artifact_naming: ArtifactNaming,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            concurrency_limit: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            backoff_step: Duration::from_millis(DEFAULT_BACKOFF_STEP_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            artifact_naming: ArtifactNaming::Title,
        }
    }
}

impl CrawlConfig {
    /// Checks every setting against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        check_range(
            "concurrency_limit",
            self.concurrency_limit as u64,
            CONCURRENCY_RANGE.contains(&self.concurrency_limit),
            "1..=100",
        )?;
        check_range(
            "max_retries",
            u64::from(self.max_retries),
            MAX_RETRIES_RANGE.contains(&self.max_retries),
            "1..=10",
        )?;
        let timeout_secs = self.timeout.as_secs();
        check_range(
            "timeout_seconds",
            timeout_secs,
            TIMEOUT_RANGE.contains(&timeout_secs),
            "1..=3600",
        )?;
        let step_ms = u64::try_from(self.backoff_step.as_millis()).unwrap_or(u64::MAX);
        check_range(
            "backoff_step_ms",
            step_ms,
            step_ms <= BACKOFF_STEP_MAX_MS,
            "0..=60000",
        )
    }

    /// Where the metadata CSV lives.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        if self.metadata_file.is_absolute() {
            self.metadata_file.clone()
        } else {
            self.output_dir.join(&self.metadata_file)
        }
    }

    /// Retry policy shared by page fetches and downloads.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Backoff::linear(self.backoff_step))
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
        }),
    }
}

fn check_range(
    key: &'static str,
    value: u64,
    in_range: bool,
    range: &'static str,
) -> Result<(), ConfigError> {
    if in_range {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { key, value, range })
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    /// `info`
    Default,
    /// `debug`
    Verbose,
    /// `error`
    Quiet,
    /// `trace`
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }

    /// Log filter level for this setting.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "verbose" => Some(Self::Verbose),
            "quiet" => Some(Self::Quiet),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Settings read from a config file. Unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Site root.
    pub base_url: Option<String>,
    /// Output directory.
    pub output_dir: Option<PathBuf>,
    /// Metadata CSV path.
    pub metadata_file: Option<PathBuf>,
    /// Paper concurrency ceiling.
    pub concurrency_limit: Option<usize>,
    /// Attempts per request.
    pub max_retries: Option<u32>,
    /// Per-attempt timeout in seconds.
    pub timeout_seconds: Option<u64>,
    /// Linear backoff step in milliseconds.
    pub backoff_step_ms: Option<u64>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Artifact naming mode.
    pub artifact_naming: Option<ArtifactNaming>,
    /// Default log verbosity.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Parses config file content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on syntax errors, unknown keys, malformed
    /// values, or values outside their ranges.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        for (line_index, raw_line) in raw.lines().enumerate() {
            let line_no = line_index + 1;
            let line = strip_inline_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            let Some((raw_key, raw_value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: line_no });
            };
            let value = raw_value.trim();

            match raw_key.trim() {
                "base_url" => cfg.base_url = Some(string_value("base_url", value, line_no)?),
                "output_dir" => {
                    cfg.output_dir = Some(string_value("output_dir", value, line_no)?.into());
                }
                "metadata_file" => {
                    cfg.metadata_file =
                        Some(string_value("metadata_file", value, line_no)?.into());
                }
                "concurrency_limit" => {
                    let parsed = integer_value("concurrency_limit", value, line_no)?;
                    cfg.concurrency_limit = Some(usize::try_from(parsed).unwrap_or(usize::MAX));
                }
                "max_retries" => {
                    let parsed = integer_value("max_retries", value, line_no)?;
                    cfg.max_retries = Some(u32::try_from(parsed).unwrap_or(u32::MAX));
                }
                "timeout_seconds" => {
                    cfg.timeout_seconds = Some(integer_value("timeout_seconds", value, line_no)?);
                }
                "backoff_step_ms" => {
                    cfg.backoff_step_ms = Some(integer_value("backoff_step_ms", value, line_no)?);
                }
                "user_agent" => cfg.user_agent = Some(string_value("user_agent", value, line_no)?),
                "artifact_naming" => {
                    let parsed = string_value("artifact_naming", value, line_no)?;
                    let naming =
                        ArtifactNaming::parse(&parsed).ok_or_else(|| ConfigError::InvalidValue {
                            key: "artifact_naming",
                            line: line_no,
                            reason: format!("'{parsed}', expected one of: title, url"),
                        })?;
                    cfg.artifact_naming = Some(naming);
                }
                "verbosity" => {
                    let parsed = string_value("verbosity", value, line_no)?;
                    let verbosity =
                        VerbositySetting::parse(&parsed).ok_or_else(|| ConfigError::InvalidValue {
                            key: "verbosity",
                            line: line_no,
                            reason: format!(
                                "'{parsed}', expected one of: default, verbose, quiet, debug"
                            ),
                        })?;
                    cfg.verbosity = Some(verbosity);
                }
                unknown => {
                    return Err(ConfigError::UnknownKey {
                        key: unknown.to_string(),
                        line: line_no,
                    });
                }
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or any parse
    /// error from [`FileConfig::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Validates values against the same ranges as [`CrawlConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut merged = CrawlConfig::default();
        self.apply_to(&mut merged);
        merged.validate()
    }

    /// Overwrites the fields of `config` this file sets.
    pub fn apply_to(&self, config: &mut CrawlConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if let Some(metadata_file) = &self.metadata_file {
            config.metadata_file.clone_from(metadata_file);
        }
        if let Some(limit) = self.concurrency_limit {
            config.concurrency_limit = limit;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(secs) = self.timeout_seconds {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(step_ms) = self.backoff_step_ms {
            config.backoff_step = Duration::from_millis(step_ms);
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent.clone_from(user_agent);
        }
        if let Some(naming) = self.artifact_naming {
            config.artifact_naming = naming;
        }
    }
}

/// A config file lookup result.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was consulted, if one could be determined.
    pub path: Option<PathBuf>,
    /// Parsed settings when the file exists.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/papercrawl/config.toml`
/// 2. `$HOME/.config/papercrawl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("papercrawl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("papercrawl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or at the default path when `None`.
///
/// A missing default file is not an error; a missing explicit file is.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(FileConfig::load(path)?),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(p) if p.exists() => Some(FileConfig::load(p)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn string_value(key: &'static str, raw: &str, line: usize) -> Result<String, ConfigError> {
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return Err(ConfigError::InvalidValue {
            key,
            line,
            reason: "expected double-quoted string".to_string(),
        });
    }
    Ok(raw[1..raw.len() - 1].to_string())
}

fn integer_value(key: &'static str, raw: &str, line: usize) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        key,
        line,
        reason: format!("expected non-negative integer ({e})"),
    })
}
