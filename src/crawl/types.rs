//! Values produced while walking the site.

use crate::metadata::PaperRecord;
use crate::parser::{Link, parse_year};

/// A per-year archive page and the year parsed from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearArchive {
    /// Publication year.
    pub year: i32,
    /// Absolute archive URL.
    pub url: String,
}

impl YearArchive {
    /// Builds an archive from a root-page link, or `None` if its URL carries
    /// no recognisable year.
    #[must_use]
    pub fn from_link(link: &Link) -> Option<Self> {
        parse_year(&link.url).map(|year| Self {
            year,
            url: link.url.clone(),
        })
    }
}

/// A paper whose PDF link and title were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperDiscovery {
    /// Year of the archive the paper was listed in.
    pub year: i32,
    /// Abstract page URL (the PDF URL for direct entries).
    pub paper_url: String,
    /// Absolute PDF URL.
    pub pdf_url: String,
    /// Paper title.
    pub title: String,
}

impl PaperDiscovery {
    /// The metadata row for this discovery.
    #[must_use]
    pub fn to_record(&self) -> PaperRecord {
        PaperRecord {
            year: self.year,
            paper_url: self.paper_url.clone(),
            pdf_url: self.pdf_url.clone(),
            title: self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_archive_from_link() {
        let link = Link {
            url: "https://papers.nips.cc/paper_files/paper/2020".to_string(),
            text: "NeurIPS 2020".to_string(),
        };
        assert_eq!(
            YearArchive::from_link(&link),
            Some(YearArchive {
                year: 2020,
                url: link.url.clone(),
            })
        );
    }

    #[test]
    fn test_year_archive_without_year() {
        let link = Link {
            url: "https://papers.nips.cc/paper_files/paper/".to_string(),
            text: "All".to_string(),
        };
        assert_eq!(YearArchive::from_link(&link), None);
    }

    #[test]
    fn test_discovery_to_record_keeps_fields() {
        let discovery = PaperDiscovery {
            year: 2019,
            paper_url: "https://x/a-Abstract.html".to_string(),
            pdf_url: "https://x/a-Paper.pdf".to_string(),
            title: "A".to_string(),
        };
        let record = discovery.to_record();
        assert_eq!(record.year, 2019);
        assert_eq!(record.paper_url, discovery.paper_url);
        assert_eq!(record.pdf_url, discovery.pdf_url);
        assert_eq!(record.title, "A");
    }
}
