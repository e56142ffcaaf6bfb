//! Page parsing for proceedings sites.
//!
//! This module turns fetched markup into links the crawl can follow:
//!
//! - archive links (years and books) on the site root
//! - paper entries on a year archive page
//! - the PDF link and `<title>` of a paper page
//!
//! plus [`parse_year`] for archive URLs. Parsing is synchronous and never
//! fails on content; missing elements become empty results.
//!
//! # Example
//!
//! ```
//! use papercrawl_core::parser::archive_links;
//! use url::Url;
//!
//! let base = Url::parse("https://papers.nips.cc/").unwrap();
//! let links = archive_links(r#"<a href="/paper_files/paper/2020">2020</a>"#, &base);
//! assert_eq!(links[0].url, "https://papers.nips.cc/paper_files/paper/2020");
//! ```

mod error;
mod links;
mod year;

pub use error::ParseError;
pub use links::{
    ARCHIVE_SELECTOR, Link, PAPER_ENTRY_SELECTOR, PDF_SELECTOR, PaperEntry, PaperPage,
    archive_links, extract_links, extract_links_matching, is_paper_pdf_url, paper_entries,
};
pub use year::parse_year;
