//! Year extraction from archive URLs.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Trailing `-YYYY` in a book slug such as
/// `advances-in-neural-information-processing-systems-32-2019`.
#[allow(clippy::expect_used)]
static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{4})$").expect("trailing year regex is valid"));

/// Parses the publication year of an archive URL.
///
/// The last non-empty path segment is taken as the year when it is an integer
/// (`/paper_files/paper/2020`). Otherwise a trailing `-YYYY` in that segment
/// is used. Returns `None` when neither applies.
///
/// # Examples
///
/// ```
/// use papercrawl_core::parser::parse_year;
///
/// assert_eq!(parse_year("https://papers.nips.cc/paper_files/paper/2020"), Some(2020));
/// assert_eq!(parse_year("https://papers.nips.cc/book/nips-32-2019"), Some(2019));
/// assert_eq!(parse_year("https://papers.nips.cc/about"), None);
/// ```
#[must_use]
pub fn parse_year(archive_url: &str) -> Option<i32> {
    let url = Url::parse(archive_url).ok()?;
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;

    if let Ok(year) = segment.parse::<i32>() {
        return Some(year);
    }

    TRAILING_YEAR
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
