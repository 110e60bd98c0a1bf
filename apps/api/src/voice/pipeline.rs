use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::{ExtractedPreference, PreferenceExtractor};
use crate::graph::{preference_node, GraphNode};
use crate::models::preference::UserType;
use crate::preferences::gate::{decide, ConfirmationRequest, GateDecision};
use crate::preferences::store::{NewPreference, PreferenceStore};

/// Transcripts shorter than this (after trimming) carry nothing worth extracting.
pub const MIN_TRANSCRIPT_CHARS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub extracted: usize,
    pub auto_added: usize,
    pub needs_confirmation: usize,
    /// Discarded by the gate for low confidence.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct CaptureOutcome {
    pub success: bool,
    /// Graph nodes for preferences committed as validated.
    pub immediate_nodes: Vec<GraphNode>,
    pub confirmation_requests: Vec<ConfirmationRequest>,
    pub stats: CaptureStats,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

pub fn validate_transcript(transcript: &str) -> Result<&str, AppError> {
    let trimmed = transcript.trim();
    if trimmed.chars().count() < MIN_TRANSCRIPT_CHARS {
        return Err(AppError::Validation("Transcript too short".to_string()));
    }
    Ok(trimmed)
}

/// Extracts candidates from `transcript`, gates each one, and writes every
/// candidate the gate does not discard.
///
/// A failed write is recorded and the remaining candidates are still
/// processed. Only when every attempted write failed is the first error
/// returned.
pub async fn capture(
    store: &dyn PreferenceStore,
    extractor: &PreferenceExtractor,
    user_id: &str,
    transcript: &str,
    user_type: UserType,
) -> Result<CaptureOutcome, AppError> {
    let transcript = validate_transcript(transcript)?;
    let extraction = extractor.extract(transcript).await;
    let candidates = merge_case_variants(extraction.candidates);

    let mut stats = CaptureStats {
        extracted: candidates.len(),
        ..CaptureStats::default()
    };
    let mut immediate_nodes = Vec::new();
    let mut confirmation_requests = Vec::new();
    let mut errors = Vec::new();
    let mut first_error: Option<AppError> = None;

    for candidate in &candidates {
        let decision = decide(candidate.confidence, candidate.requires_hard_validation);
        let Some(validated) = decision.validated() else {
            stats.skipped += 1;
            continue;
        };

        let written = match NewPreference::new(
            user_id,
            candidate.preference_type,
            &candidate.value,
            validated,
        ) {
            Ok(preference) => {
                store
                    .upsert(
                        preference
                            .with_confidence(candidate.confidence)
                            .with_raw_text(Some(&candidate.raw_text)),
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        match (written, decision) {
            (Ok(stored), GateDecision::Commit) => {
                stats.auto_added += 1;
                immediate_nodes.push(preference_node(&stored, user_type));
            }
            (Ok(_), GateDecision::Confirm(kind)) => {
                stats.needs_confirmation += 1;
                confirmation_requests.push(ConfirmationRequest::new(candidate, kind, user_type));
            }
            (Ok(_), GateDecision::Discard) => stats.skipped += 1,
            (Err(e), _) => {
                warn!(
                    "Failed to save {} '{}' for user {user_id}: {e}",
                    candidate.preference_type, candidate.value
                );
                stats.failed += 1;
                errors.push(format!(
                    "{} '{}': {e}",
                    candidate.preference_type, candidate.value
                ));
                first_error.get_or_insert(e);
            }
        }
    }

    if stats.auto_added + stats.needs_confirmation == 0 {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    info!(
        "Voice capture for user {user_id}: extracted={} auto_added={} needs_confirmation={} skipped={} failed={} fallback={}",
        stats.extracted,
        stats.auto_added,
        stats.needs_confirmation,
        stats.skipped,
        stats.failed,
        extraction.fallback
    );

    Ok(CaptureOutcome {
        success: true,
        immediate_nodes,
        confirmation_requests,
        stats,
        fallback: extraction.fallback,
        errors,
    })
}

/// Collapses candidates that name the same record (same type, value equal
/// ignoring case) into the first one, keeping the highest confidence and any
/// hard flag. The store merges them the same way.
fn merge_case_variants(candidates: Vec<ExtractedPreference>) -> Vec<ExtractedPreference> {
    let mut merged: Vec<ExtractedPreference> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let existing = merged.iter_mut().find(|m| {
            m.preference_type == candidate.preference_type
                && m.value.to_lowercase() == candidate.value.to_lowercase()
        });
        match existing {
            Some(m) => {
                m.confidence = m.confidence.max(candidate.confidence);
                m.requires_hard_validation |= candidate.requires_hard_validation;
            }
            None => merged.push(candidate),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::extraction::remote::RemoteExtractionError;
    use crate::extraction::ExtractionBackend;
    use crate::models::preference::{Preference, PreferenceType};
    use crate::preferences::gate::ValidationKind;
    use crate::preferences::memory::MemoryPreferenceStore;

    /// Fails writes for one value, delegates everything else.
    struct FlakyStore {
        inner: MemoryPreferenceStore,
        poisoned_value: Option<&'static str>,
    }

    #[async_trait]
    impl PreferenceStore for FlakyStore {
        async fn upsert(&self, preference: NewPreference) -> Result<Preference, AppError> {
            match self.poisoned_value {
                Some(v) if v == preference.preference_value || v == "*" => {
                    Err(AppError::Database(sqlx::Error::PoolTimedOut))
                }
                _ => self.inner.upsert(preference).await,
            }
        }

        async fn delete(
            &self,
            user_id: &str,
            preference_type: PreferenceType,
            value: &str,
        ) -> Result<Option<Preference>, AppError> {
            self.inner.delete(user_id, preference_type, value).await
        }

        async fn list(&self, user_id: &str) -> Result<Vec<Preference>, AppError> {
            self.inner.list(user_id).await
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

    fn candidate(t: PreferenceType, value: &str, confidence: f64, hard: bool) -> ExtractedPreference {
        ExtractedPreference {
            preference_type: t,
            value: value.to_string(),
            confidence,
            raw_text: "transcript".to_string(),
            requires_hard_validation: hard,
        }
    }

    const UTTERANCE: &str = "I'm looking for a CFO role in London, minimum £1200 per day";

    #[tokio::test]
    async fn test_fallback_capture_routes_through_gate() {
        let store = MemoryPreferenceStore::default();
        let outcome = capture(
            &store,
            &PreferenceExtractor::default(),
            "u1",
            UTTERANCE,
            UserType::Candidate,
        )
        .await
        .unwrap();

        assert!(outcome.fallback);
        assert_eq!(
            outcome.stats,
            CaptureStats {
                extracted: 3,
                auto_added: 2,
                needs_confirmation: 1,
                skipped: 0,
                failed: 0,
            }
        );
        assert_eq!(outcome.immediate_nodes.len(), 2);
        assert_eq!(outcome.confirmation_requests[0].value, "£1200");
        assert_eq!(
            outcome.confirmation_requests[0].validation_type,
            ValidationKind::Hard
        );

        let stored = store.list("u1").await.unwrap();
        assert_eq!(stored.len(), 3);
        let day_rate = stored
            .iter()
            .find(|p| p.preference_type == PreferenceType::DayRate)
            .unwrap();
        assert!(!day_rate.validated);
        assert_eq!(day_rate.raw_text.as_deref(), Some(UTTERANCE));
    }

    #[tokio::test]
    async fn test_low_confidence_candidates_are_skipped() {
        let store = MemoryPreferenceStore::default();
        let extractor = PreferenceExtractor::new(Some(Arc::new(FixedBackend(vec![
            candidate(PreferenceType::Industry, "Fintech", 0.3, false),
            candidate(PreferenceType::Skill, "Strategy", 0.65, false),
        ]))));

        let outcome = capture(
            &store,
            &extractor,
            "u1",
            "fintech strategy work",
            UserType::Candidate,
        )
        .await
        .unwrap();

        assert!(!outcome.fallback);
        assert_eq!(outcome.stats.skipped, 1);
        assert_eq!(outcome.stats.needs_confirmation, 1);
        assert_eq!(
            outcome.confirmation_requests[0].validation_type,
            ValidationKind::Soft
        );
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_write_failure_is_reported() {
        let store = FlakyStore {
            inner: MemoryPreferenceStore::default(),
            poisoned_value: Some("London"),
        };
        let outcome = capture(
            &store,
            &PreferenceExtractor::default(),
            "u1",
            UTTERANCE,
            UserType::Candidate,
        )
        .await
        .unwrap();

        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.stats.auto_added, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("location 'London'"));
    }

    #[tokio::test]
    async fn test_total_write_failure_is_an_error() {
        let store = FlakyStore {
            inner: MemoryPreferenceStore::default(),
            poisoned_value: Some("*"),
        };
        let result = capture(
            &store,
            &PreferenceExtractor::default(),
            "u1",
            UTTERANCE,
            UserType::Candidate,
        )
        .await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_nothing_recognised_is_not_an_error() {
        let store = MemoryPreferenceStore::default();
        let outcome = capture(
            &store,
            &PreferenceExtractor::default(),
            "u1",
            "hello there, nice weather",
            UserType::Candidate,
        )
        .await
        .unwrap();

        assert_eq!(outcome.stats, CaptureStats::default());
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_case_variants_count_once() {
        let store = MemoryPreferenceStore::default();
        let extractor = PreferenceExtractor::new(Some(Arc::new(FixedBackend(vec![
            candidate(PreferenceType::Industry, "Fintech", 0.85, false),
            candidate(PreferenceType::Industry, "fintech", 0.9, false),
            candidate(PreferenceType::Company, "FINTECH", 0.9, false),
        ]))));

        let outcome = capture(
            &store,
            &extractor,
            "u1",
            "fintech, fintech, Fintech",
            UserType::Candidate,
        )
        .await
        .unwrap();

        assert_eq!(outcome.stats.extracted, 2);
        assert_eq!(outcome.stats.auto_added, 2);
        assert_eq!(outcome.immediate_nodes.len(), 2);
        assert_eq!(store.list("u1").await.unwrap().len(), 2);
    }

    #[test]
    fn test_merge_keeps_first_spelling_and_strongest_signal() {
        let merged = merge_case_variants(vec![
            candidate(PreferenceType::Location, "London", 0.6, false),
            candidate(PreferenceType::Location, "LONDON", 0.9, true),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value, "London");
        assert_eq!(merged[0].confidence, 0.9);
        assert!(merged[0].requires_hard_validation);
    }

    #[tokio::test]
    async fn test_short_transcript_rejected() {
        let store = MemoryPreferenceStore::default();
        let result = capture(
            &store,
            &PreferenceExtractor::default(),
            "u1",
            "  CFO ",
            UserType::Candidate,
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
