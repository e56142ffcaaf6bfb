//! Gemini classifier over the Generative Language REST API.
//!
//! The [`GeminiClassifier`] sends one `generateContent` request per title and
//! reads the first candidate's text as the model reply. The API key travels in
//! the `x-goog-api-key` header so it never appears in request URLs or logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Classification, ClassifyError, Classifier, build_prompt};
use crate::user_agent::DEFAULT_USER_AGENT;

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Model used unless configured otherwise.
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const REQUEST_TIMEOUT_SECS: u64 = 60;

// ==================== API Request/Response Types ====================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

// ==================== GeminiClassifier ====================

/// Classifies titles with a Gemini model.
pub struct GeminiClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClassifier {
    /// Creates a classifier for `model` with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Network`] if HTTP client construction fails.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ClassifyError> {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT)
    }

    /// Creates a classifier reading its key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::MissingApiKey`] if the variable is unset or
    /// empty.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ClassifyError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ClassifyError::MissingApiKey { var: API_KEY_ENV })?;
        Self::new(api_key, model)
    }

    /// Creates a classifier against a custom endpoint (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Network`] if HTTP client construction fails.
    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(ClassifyError::Network)?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Model name requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

impl std::fmt::Debug for GeminiClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClassifier")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[tracing::instrument(skip(self), fields(model = %self.model))]
    async fn classify(&self, title: &str) -> Result<Classification, ClassifyError> {
        let prompt = build_prompt(title);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || message.contains("RESOURCE_EXHAUSTED") {
                return Err(ClassifyError::RateLimited { message });
            }
            return Err(ClassifyError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ClassifyError::InvalidResponse {
                    reason: e.without_url().to_string(),
                })?;

        let Some(text) = parsed.first_text() else {
            debug!("empty model reply");
            return Ok(Classification::unknown());
        };
        Ok(Classification::from_reply(text))
    }
}
