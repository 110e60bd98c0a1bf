//! Extraction Adapter: turns a free-text utterance into typed candidate preferences.
//!
//! The remote extraction service is tried first when configured. Any failure
//! there (transport, non-2xx, malformed payload) falls back to the local
//! pattern matcher, which never fails.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::preference::PreferenceType;

pub mod constraints;
pub mod fallback;
pub mod remote;

use remote::RemoteExtractionError;

/// One candidate fact extracted from an utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedPreference {
    pub preference_type: PreferenceType,
    pub value: String,
    /// 0.0 – 1.0
    pub confidence: f64,
    pub raw_text: String,
    /// The utterance states an absolute constraint about this fact.
    pub requires_hard_validation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub candidates: Vec<ExtractedPreference>,
    /// True when the local matcher produced the candidates.
    pub fallback: bool,
}

/// A remote extraction backend. Swappable so tests can simulate outages.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(
        &self,
        utterance: &str,
    ) -> Result<Vec<ExtractedPreference>, RemoteExtractionError>;
}

#[derive(Clone, Default)]
pub struct PreferenceExtractor {
    remote: Option<Arc<dyn ExtractionBackend>>,
}

impl PreferenceExtractor {
    pub fn new(remote: Option<Arc<dyn ExtractionBackend>>) -> Self {
        Self { remote }
    }

    pub async fn extract(&self, utterance: &str) -> Extraction {
        if let Some(remote) = &self.remote {
            match remote.extract(utterance).await {
                Ok(candidates) => {
                    debug!("Remote extraction returned {} candidates", candidates.len());
                    return Extraction {
                        candidates,
                        fallback: false,
                    };
                }
                Err(e) => warn!("Remote extraction failed, using local fallback: {e}"),
            }
        }

        let candidates = fallback::extract(utterance);
        debug!("Local fallback extracted {} candidates", candidates.len());
        Extraction {
            candidates,
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    #[async_trait]
    impl ExtractionBackend for FailingBackend {
        async fn extract(
            &self,
            _utterance: &str,
        ) -> Result<Vec<ExtractedPreference>, RemoteExtractionError> {
            Err(RemoteExtractionError::Api {
                status: 503,
                message: "gateway down".to_string(),
            })
        }
    }

    struct FixedBackend(Vec<ExtractedPreference>);

    #[async_trait]
    impl ExtractionBackend for FixedBackend {
        async fn extract(
            &self,
            _utterance: &str,
        ) -> Result<Vec<ExtractedPreference>, RemoteExtractionError> {
            Ok(self.0.clone())
        }
    }

    const UTTERANCE: &str = "I'm looking for a CFO role in London";

    #[tokio::test]
    async fn test_no_remote_uses_fallback() {
        let extraction = PreferenceExtractor::default().extract(UTTERANCE).await;
        assert!(extraction.fallback);
        assert_eq!(extraction.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let extractor = PreferenceExtractor::new(Some(Arc::new(FailingBackend)));
        let extraction = extractor.extract(UTTERANCE).await;
        assert!(extraction.fallback);
        assert_eq!(extraction.candidates[0].value, "CFO");
    }

    #[tokio::test]
    async fn test_remote_success_is_used_as_is() {
        let remote = ExtractedPreference {
            preference_type: PreferenceType::Industry,
            value: "Fintech".to_string(),
            confidence: 0.92,
            raw_text: UTTERANCE.to_string(),
            requires_hard_validation: false,
        };
        let extractor = PreferenceExtractor::new(Some(Arc::new(FixedBackend(vec![remote.clone()]))));
        let extraction = extractor.extract(UTTERANCE).await;
        assert!(!extraction.fallback);
        assert_eq!(extraction.candidates, vec![remote]);
    }
}
