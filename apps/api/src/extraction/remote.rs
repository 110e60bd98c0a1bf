/// Client for the remote structured-extraction service.
///
/// The service answers `POST {base}/pydantic-extract` with grouped
/// preferences; `flatten` turns that into one candidate per value.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::constraints::detects_hard_constraint;
use crate::extraction::{ExtractedPreference, ExtractionBackend};
use crate::models::preference::PreferenceType;
use crate::preferences::normalize::normalize_value;

const EXTRACT_PATH: &str = "/pydantic-extract";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Error)]
pub enum RemoteExtractionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    transcript: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RemoteResponse {
    /// Required: a 2xx body without it (`{"error": ...}`) is a parse error.
    pub preferences: Vec<RemotePreference>,
}

#[derive(Debug, Deserialize)]
pub struct RemotePreference {
    #[serde(rename = "type")]
    pub preference_type: String,
    #[serde(default)]
    pub values: Vec<String>,
    pub confidence: Option<f64>,
    pub raw_text: Option<String>,
    #[serde(default)]
    pub requires_hard_validation: bool,
}

#[derive(Clone)]
pub struct RemoteExtractor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteExtractor {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, RemoteExtractionError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl ExtractionBackend for RemoteExtractor {
    async fn extract(
        &self,
        utterance: &str,
    ) -> Result<Vec<ExtractedPreference>, RemoteExtractionError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, EXTRACT_PATH))
            .json(&ExtractRequest {
                transcript: utterance,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteExtractionError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        // Read as text first so a malformed body surfaces as a parse error
        // rather than a transport error.
        let body = response.text().await?;
        let parsed: RemoteResponse = serde_json::from_str(&body)?;
        debug!(
            "Extraction service returned {} preference groups",
            parsed.preferences.len()
        );

        Ok(flatten(utterance, parsed))
    }
}

/// One candidate per value. Unknown types and blank values are dropped;
/// confidence is clamped to 0..=1.
pub fn flatten(utterance: &str, response: RemoteResponse) -> Vec<ExtractedPreference> {
    let mut candidates = Vec::new();

    for group in response.preferences {
        let preference_type: PreferenceType = match group.preference_type.parse() {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping remote preference group: {e}");
                continue;
            }
        };

        let confidence = group
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0);
        let raw_text = group
            .raw_text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| utterance.trim().to_string());
        let requires_hard_validation =
            group.requires_hard_validation || detects_hard_constraint(&raw_text);

        for value in &group.values {
            let Some(value) = normalize_value(preference_type, value) else {
                continue;
            };
            candidates.push(ExtractedPreference {
                preference_type,
                value,
                confidence,
                raw_text: raw_text.clone(),
                requires_hard_validation,
            });
        }
    }

    candidates
}
