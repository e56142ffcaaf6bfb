//! Artifact file naming: title sanitization and URL-derived names.
//!
//! Titles become file names by replacing `< > : " / \ | ? *` (and control
//! characters) with `_` and truncating to 200 characters (and 240 bytes)
//! before `.pdf` is appended. Two titles that sanitize to the same name share
//! one artifact; [`ArtifactNaming::Url`] keys files by the PDF URL instead.

use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use url::Url;

use super::constants::{
    FILENAME_PLACEHOLDER, MAX_FILENAME_BYTES, MAX_FILENAME_CHARS, PARTIAL_PREFIX, PARTIAL_SUFFIX,
};

const PDF_EXTENSION: &str = ".pdf";

/// How downloaded artifacts are named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactNaming {
    /// `<sanitized title>.pdf`
    #[default]
    Title,
    /// Sanitized last path segment of the PDF URL.
    Url,
}

impl ArtifactNaming {
    /// Returns the stable string label used in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Url => "url",
        }
    }

    /// Parses a config label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" => Some(Self::Title),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    /// File name for a paper under this naming scheme.
    ///
    /// URL naming falls back to the title when the URL has no usable segment.
    #[must_use]
    pub fn artifact_filename(self, title: &str, pdf_url: &str) -> String {
        match self {
            Self::Title => title_filename(title),
            Self::Url => url_filename(pdf_url).unwrap_or_else(|| title_filename(title)),
        }
    }
}

/// Sanitizes a title for use as a file name stem.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |`) and control characters with `_`, then keeps at most
/// 200 characters. The result is also cut at a character boundary to at most
/// 240 bytes so that multi-byte titles stay within filesystem name limits.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = String::new();
    let chars = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => FILENAME_PLACEHOLDER,
            c if c.is_control() => FILENAME_PLACEHOLDER,
            c => c,
        })
        .take(MAX_FILENAME_CHARS);
    for c in chars {
        if sanitized.len() + c.len_utf8() > MAX_FILENAME_BYTES {
            break;
        }
        sanitized.push(c);
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

/// `<sanitized title>.pdf`
#[must_use]
pub fn title_filename(title: &str) -> String {
    format!("{}{PDF_EXTENSION}", sanitize_title(title))
}

/// Sanitized, percent-decoded last path segment of a PDF URL, always ending in `.pdf`.
#[must_use]
pub fn url_filename(pdf_url: &str) -> Option<String> {
    let parsed = Url::parse(pdf_url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    let stem = decoded
        .strip_suffix(PDF_EXTENSION)
        .or_else(|| decoded.strip_suffix(".PDF"))
        .unwrap_or(&decoded);
    let stem = sanitize_title(stem);
    (!stem.is_empty()).then(|| format!("{stem}{PDF_EXTENSION}"))
}

/// Creates a uniquely named in-progress file in `dir`.
///
/// Every download attempt gets its own file, so two attempts aimed at the
/// same artifact never write into each other. The file is removed when the
/// handle drops unless it is persisted first.
pub(crate) fn create_partial_file(dir: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)
}

/// Returns `true` for in-progress files left in an output directory.
#[must_use]
pub fn is_partial_file(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX) && name.ends_with(PARTIAL_SUFFIX)
}

/// Rejects names that would resolve outside the output directory.
fn is_safe_filename_segment(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
