//! CSS-selector link extraction over proceedings pages.
//!
//! All functions here are pure: they take page markup plus the base URL that
//! relative links resolve against and return absolute links. The crawl passes
//! the site root for every page. A page without matches yields an empty list.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::error::ParseError;

/// Year and book archive links on the site root.
pub const ARCHIVE_SELECTOR: &str = "a[href^='/paper_files/paper/'], a[href^='/book/']";

/// Paper entries on a year archive page: abstract pages plus direct links to
/// conference paper PDFs.
pub const PAPER_ENTRY_SELECTOR: &str = "ul.paper-list li a[href$='Abstract.html'], \
     ul.paper-list li a[href$='Abstract-Conference.html'], \
     a[href$='Paper.pdf'], a[href$='Paper-Conference.pdf']";

/// PDF link on a paper page.
pub const PDF_SELECTOR: &str = "a[href$='Paper.pdf'], a[href$='Paper-Conference.pdf']";

/// Path suffixes that mark a conference paper PDF.
const PAPER_PDF_SUFFIXES: [&str; 2] = ["Paper.pdf", "Paper-Conference.pdf"];

struct Selectors {
    archive: Selector,
    paper_entry: Selector,
    pdf: Selector,
    title: Selector,
}

#[allow(clippy::expect_used)]
static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    archive: Selector::parse(ARCHIVE_SELECTOR).expect("archive selector is valid"),
    paper_entry: Selector::parse(PAPER_ENTRY_SELECTOR).expect("paper entry selector is valid"),
    pdf: Selector::parse(PDF_SELECTOR).expect("pdf selector is valid"),
    title: Selector::parse("title").expect("title selector is valid"),
});

/// An absolute link and its anchor text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute `http`/`https` URL.
    pub url: String,
    /// Anchor text with whitespace collapsed.
    pub text: String,
}

/// One entry of a year archive's paper list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperEntry {
    /// Link to a paper's abstract page.
    Page(Link),
    /// Link straight to a PDF, with no abstract page in between.
    DirectPdf(Link),
}

impl PaperEntry {
    /// The entry's link, whichever kind it is.
    #[must_use]
    pub fn link(&self) -> &Link {
        match self {
            Self::Page(link) | Self::DirectPdf(link) => link,
        }
    }
}

/// What a paper page contributes to a discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperPage {
    /// First PDF link on the page, if any.
    pub pdf: Option<Link>,
    /// Text of the `<title>` element, if present and non-blank.
    pub title: Option<String>,
}

impl PaperPage {
    /// Parses a paper page, resolving its links against `base`.
    #[must_use]
    pub fn parse(body: &str, base: &Url) -> Self {
        let document = Html::parse_document(body);
        let pdf = select_links(&document, &SELECTORS.pdf, base)
            .into_iter()
            .next();
        let title = document
            .select(&SELECTORS.title)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty());
        Self { pdf, title }
    }
}

/// Returns the absolute URLs of all `selector` matches in `body`.
///
/// Links are resolved against `base`; duplicates are collapsed keeping the
/// first occurrence, and anchors without an `href` or with a non-web scheme are
/// skipped.
#[must_use]
pub fn extract_links(body: &str, selector: &Selector, base: &Url) -> Vec<Link> {
    let document = Html::parse_document(body);
    select_links(&document, selector, base)
}

/// Like [`extract_links`] for a selector given as a pattern string.
///
/// # Errors
///
/// Returns [`ParseError::InvalidSelector`] if `pattern` is not a valid CSS
/// selector.
pub fn extract_links_matching(
    body: &str,
    pattern: &str,
    base: &Url,
) -> Result<Vec<Link>, ParseError> {
    let selector =
        Selector::parse(pattern).map_err(|e| ParseError::invalid_selector(pattern, format!("{e:?}")))?;
    Ok(extract_links(body, &selector, base))
}

/// Year and book archive links on the site root.
#[tracing::instrument(skip(body, base), fields(base = %base))]
#[must_use]
pub fn archive_links(body: &str, base: &Url) -> Vec<Link> {
    let links = extract_links(body, &SELECTORS.archive, base);
    debug!(count = links.len(), "archive links extracted");
    links
}

/// Paper entries on a year archive page.
#[tracing::instrument(skip(body, base), fields(base = %base))]
#[must_use]
pub fn paper_entries(body: &str, base: &Url) -> Vec<PaperEntry> {
    let entries: Vec<PaperEntry> = extract_links(body, &SELECTORS.paper_entry, base)
        .into_iter()
        .map(|link| {
            if is_paper_pdf_url(&link.url) {
                PaperEntry::DirectPdf(link)
            } else {
                PaperEntry::Page(link)
            }
        })
        .collect();
    debug!(count = entries.len(), "paper entries extracted");
    entries
}

fn select_links(document: &Html, selector: &Selector, base: &Url) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve(base, href) else {
            trace!(href, "skipping unresolvable link");
            continue;
        };
        if seen.insert(url.clone()) {
            links.push(Link {
                url,
                text: element_text(element),
            });
        }
    }

    links
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns `true` if `url`'s path ends in `Paper.pdf` or
/// `Paper-Conference.pdf`.
#[must_use]
pub fn is_paper_pdf_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| {
        PAPER_PDF_SUFFIXES
            .iter()
            .any(|suffix| parsed.path().ends_with(suffix))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://papers.nips.cc/").unwrap()
    }

    #[test]
    fn test_archive_links_resolves_year_and_book_links() {
        let body = r#"<html><body>
            <a href="/paper_files/paper/2021">NeurIPS 2021</a>
            <a href="/paper_files/paper/2020">NeurIPS 2020</a>
            <a href="/book/advances-in-neural-information-processing-systems-32-2019">NIPS 2019</a>
            <a href="/admin">admin</a>
        </body></html>"#;

        let links = archive_links(body, &base());
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://papers.nips.cc/paper_files/paper/2021",
                "https://papers.nips.cc/paper_files/paper/2020",
                "https://papers.nips.cc/book/advances-in-neural-information-processing-systems-32-2019",
            ]
        );
        assert_eq!(links[0].text, "NeurIPS 2021");
    }

    #[test]
    fn test_no_matches_is_empty() {
        assert!(archive_links("<html><body><p>nothing</p></body></html>", &base()).is_empty());
        assert!(paper_entries("", &base()).is_empty());
    }

    #[test]
    fn test_duplicate_links_collapsed_in_order() {
        let body = r#"
            <a href="/paper_files/paper/2020">2020</a>
            <a href="/paper_files/paper/2019">2019</a>
            <a href="/paper_files/paper/2020">2020 again</a>"#;
        let links = archive_links(body, &base());
        assert_eq!(links.len(), 2);
        assert!(links[0].url.ends_with("2020"));
        assert!(links[1].url.ends_with("2019"));
    }

    #[test]
    fn test_paper_entries_distinguishes_pages_and_direct_pdfs() {
        let page = Url::parse("https://papers.nips.cc/paper_files/paper/2022").unwrap();
        let body = r#"<ul class="paper-list">
            <li><a href="/paper_files/paper/2022/hash/aaa-Abstract-Conference.html">Conference Paper</a></li>
            <li><a href="/paper_files/paper/2022/hash/bbb-Abstract.html">Older Layout</a></li>
            <li><a href="/paper_files/paper/2022/hash/ccc-Supplemental.zip">Supplement</a></li>
        </ul>
        <a href="/paper/1234-direct-Paper.pdf">  Direct
            Paper </a>
        <a href="/elsewhere/ddd-Abstract.html">not in the list</a>"#;

        let entries = paper_entries(body, &page);
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], PaperEntry::Page(l) if l.url.ends_with("aaa-Abstract-Conference.html")));
        assert!(matches!(&entries[1], PaperEntry::Page(l) if l.url.ends_with("bbb-Abstract.html")));
        match &entries[2] {
            PaperEntry::DirectPdf(link) => {
                assert_eq!(link.url, "https://papers.nips.cc/paper/1234-direct-Paper.pdf");
                assert_eq!(link.text, "Direct Paper");
            }
            other => panic!("expected DirectPdf, got {other:?}"),
        }
    }

    #[test]
    fn test_paper_entries_ignore_other_pdfs() {
        let body = r#"
            <a href="/paper/77-direct.pdf">PDF</a>
            <a href="/paper_files/paper/2019/file/x-Supplemental.pdf">Supplemental</a>
            <a href="/paper_files/paper/2019/file/y-Paper-Conference.pdf">Paper</a>"#;

        let entries = paper_entries(body, &base());
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], PaperEntry::DirectPdf(l) if l.url.ends_with("y-Paper-Conference.pdf")));
    }

    #[test]
    fn test_is_paper_pdf_url() {
        assert!(is_paper_pdf_url("https://papers.nips.cc/paper/1-a-Paper.pdf"));
        assert!(is_paper_pdf_url("https://papers.nips.cc/file/b-Paper-Conference.pdf"));
        assert!(!is_paper_pdf_url("https://papers.nips.cc/paper/77-direct.pdf"));
        assert!(!is_paper_pdf_url("https://papers.nips.cc/file/c-Supplemental.pdf"));
        assert!(!is_paper_pdf_url("not a url"));
    }

    #[test]
    fn test_paper_page_extracts_pdf_and_title() {
        let page = Url::parse(
            "https://papers.nips.cc/paper_files/paper/2020/hash/abc-Abstract.html",
        )
        .unwrap();
        let body = r#"<html><head><title>
            Test Paper:   A Study
        </title></head><body>
            <a href="/paper_files/paper/2020/file/abc-Supplemental.pdf">Supplemental</a>
            <a href="/paper_files/paper/2020/file/abc-Paper.pdf">Paper</a>
        </body></html>"#;

        let parsed = PaperPage::parse(body, &page);
        assert_eq!(parsed.title.as_deref(), Some("Test Paper: A Study"));
        assert_eq!(
            parsed.pdf.unwrap().url,
            "https://papers.nips.cc/paper_files/paper/2020/file/abc-Paper.pdf"
        );
    }

    #[test]
    fn test_paper_page_conference_pdf_variant() {
        let body = r#"<a href="/paper_files/paper/2023/file/x-Paper-Conference.pdf">Paper</a>"#;
        let parsed = PaperPage::parse(body, &base());
        assert!(parsed.pdf.unwrap().url.ends_with("x-Paper-Conference.pdf"));
        assert!(parsed.title.is_none());
    }

    #[test]
    fn test_paper_page_blank_title_is_absent() {
        let parsed = PaperPage::parse("<title>   </title>", &base());
        assert!(parsed.title.is_none());
        assert!(parsed.pdf.is_none());
    }

    #[test]
    fn test_relative_href_resolved_against_base() {
        let page = Url::parse("https://papers.nips.cc/paper_files/paper/2020/hash/abc-Abstract.html")
            .unwrap();
        let parsed = PaperPage::parse(r#"<a href="../file/abc-Paper.pdf">Paper</a>"#, &page);
        assert_eq!(
            parsed.pdf.unwrap().url,
            "https://papers.nips.cc/paper_files/paper/2020/file/abc-Paper.pdf"
        );
    }

    #[test]
    fn test_non_web_schemes_skipped() {
        let body = r#"<a href="mailto:someone@example.com.pdf">mail</a><a href="/x.pdf">x</a>"#;
        let links = extract_links_matching(body, "a[href$='.pdf']", &base()).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://papers.nips.cc/x.pdf");
    }

    #[test]
    fn test_extract_links_matching_rejects_bad_selector() {
        let result = extract_links_matching("<a href='/x'>x</a>", "a[href", &base());
        assert!(matches!(result, Err(ParseError::InvalidSelector { .. })));
    }
}
