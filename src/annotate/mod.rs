//! Enrichment pass: guesses a research category and authors for each
//! recorded title.
//!
//! # Architecture
//!
//! - [`Classifier`] - Async trait answering one title at a time
//! - [`GeminiClassifier`] - Classifier backed by the Generative Language REST API
//! - [`Annotator`] - Reads the metadata CSV, classifies titles concurrently
//!   with rate-limit backoff, and appends `title,Category,Authors` rows
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use papercrawl_core::annotate::{Annotator, GeminiClassifier};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = GeminiClassifier::from_env("gemini-pro")?;
//! let annotator = Annotator::new(Arc::new(classifier), 5)?;
//! let summary = annotator
//!     .annotate_file(
//!         "papers/metadata.csv".as_ref(),
//!         "papers/annotated_metadata.csv".as_ref(),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{summary:?}");
//! # Ok(())
//! # }
//! ```

mod annotator;
mod error;
mod gemini;

pub use annotator::{
    ANNOTATION_HEADER, AnnotateSummary, AnnotationRow, Annotator, DEFAULT_ANNOTATE_CONCURRENCY,
};
pub use error::{AnnotateError, ClassifyError};
pub use gemini::{API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiClassifier};

use async_trait::async_trait;
use serde::Deserialize;

/// Categories a title may be assigned to.
pub const CATEGORIES: [&str; 5] = [
    "Deep Learning/Machine Learning",
    "Computer Vision",
    "Reinforcement Learning",
    "Natural Language Processing (NLP)",
    "Optimization Algorithms",
];

/// Label for answers outside [`CATEGORIES`] or without authors.
pub const UNKNOWN: &str = "Unknown";

/// Label recorded when classification failed.
pub const ERROR: &str = "Error";

/// A category and author guess for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// One of [`CATEGORIES`], [`UNKNOWN`], or [`ERROR`].
    pub category: String,
    /// Comma-separated author names, [`UNKNOWN`], or [`ERROR`].
    pub authors: String,
}

impl Classification {
    /// Both fields `Unknown`.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            category: UNKNOWN.to_string(),
            authors: UNKNOWN.to_string(),
        }
    }

    /// Both fields `Error`.
    #[must_use]
    pub fn error() -> Self {
        Self {
            category: ERROR.to_string(),
            authors: ERROR.to_string(),
        }
    }

    /// Interprets a model reply that should be a JSON object with
    /// `Category` and `Authors` keys.
    ///
    /// Markdown code fences around the object are ignored. Unparseable replies
    /// give [`Classification::unknown`]; a category outside [`CATEGORIES`]
    /// becomes `Unknown` while the authors are kept.
    #[must_use]
    pub fn from_reply(reply: &str) -> Self {
        #[derive(Deserialize)]
        struct Reply {
            #[serde(rename = "Category")]
            category: Option<String>,
            #[serde(rename = "Authors")]
            authors: Option<String>,
        }

        let Ok(reply) = serde_json::from_str::<Reply>(strip_code_fence(reply)) else {
            return Self::unknown();
        };

        let category = reply
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| CATEGORIES.contains(&c.as_str()))
            .unwrap_or_else(|| UNKNOWN.to_string());
        let authors = reply
            .authors
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self { category, authors }
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Builds the classification prompt for `title`.
#[must_use]
pub fn build_prompt(title: &str) -> String {
    format!(
        "You are a research assistant. Classify the following research paper into one of \
         these categories: {}.\n\
         Also give the paper's authors if you know them; otherwise answer \"Unknown\".\n\
         Respond only with JSON of the form \
         {{\"Category\": \"Selected Category\", \"Authors\": \"Author1, Author2\"}}.\n\n\
         Title: \"{title}\"\n\
         Abstract: \"No abstract available\"",
        CATEGORIES.join(", ")
    )
}

/// Produces a [`Classification`] for a paper title.
///
/// # Object Safety
///
/// This trait uses `async_trait` so annotators can hold an
/// `Arc<dyn Classifier>` and swap in test doubles.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns the classifier's name for logs.
    fn name(&self) -> &str;

    /// Classifies one title.
    async fn classify(&self, title: &str) -> Result<Classification, ClassifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reply_known_category() {
        let parsed = Classification::from_reply(
            r#"{"Category": "Computer Vision", "Authors": " Ada Lovelace, Alan Turing "}"#,
        );
        assert_eq!(parsed.category, "Computer Vision");
        assert_eq!(parsed.authors, "Ada Lovelace, Alan Turing");
    }

    #[test]
    fn test_from_reply_unknown_category_keeps_authors() {
        let parsed = Classification::from_reply(r#"{"Category": "Astrology", "Authors": "X"}"#);
        assert_eq!(parsed.category, UNKNOWN);
        assert_eq!(parsed.authors, "X");
    }

    #[test]
    fn test_from_reply_code_fenced_json() {
        let parsed = Classification::from_reply(
            "```json\n{\"Category\": \"Reinforcement Learning\", \"Authors\": \"Unknown\"}\n```",
        );
        assert_eq!(parsed.category, "Reinforcement Learning");
        assert_eq!(parsed.authors, UNKNOWN);
    }

    #[test]
    fn test_from_reply_not_json() {
        assert_eq!(
            Classification::from_reply("I think it is about vision."),
            Classification::unknown()
        );
    }

    #[test]
    fn test_from_reply_missing_fields() {
        assert_eq!(Classification::from_reply("{}"), Classification::unknown());
    }

    #[test]
    fn test_prompt_lists_categories_and_title() {
        let prompt = build_prompt("Attention Is All You Need");
        for category in CATEGORIES {
            assert!(prompt.contains(category));
        }
        assert!(prompt.contains("\"Attention Is All You Need\""));
    }
}
