//! Error types for link extraction.

use thiserror::Error;

/// Errors raised while preparing an extraction.
///
/// Extraction itself never fails: a page without matches yields an empty
/// list. Only a caller-supplied selector pattern can be rejected.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// The CSS selector pattern does not parse.
    #[error("invalid selector '{selector}': {reason}\n  Suggestion: {suggestion}")]
    InvalidSelector {
        /// The pattern that failed to parse
        selector: String,
        /// Parser message
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },
}

impl ParseError {
    /// Creates an `InvalidSelector` error.
    #[must_use]
    pub fn invalid_selector(selector: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
            suggestion: "Use a CSS selector such as a[href$='.pdf']".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_display_includes_suggestion() {
        let error = ParseError::invalid_selector("a[href", "unexpected end of input");
        let message = error.to_string();
        assert!(message.contains("a[href"));
        assert!(message.contains("unexpected end of input"));
        assert!(message.contains("Suggestion:"));
    }
}
