//! Confirmation gate: decides whether an extracted preference is committed as
//! validated, staged for the user to confirm, or dropped.
//!
//! The decision is computed from the extraction signals only. Callers never
//! supply the `validated` flag themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::ExtractedPreference;
use crate::models::preference::{Cluster, PreferenceType, UserType};

/// At or above this confidence a candidate is committed without asking.
pub const AUTO_COMMIT_THRESHOLD: f64 = 0.80;
/// Below this confidence a candidate is dropped.
pub const SOFT_CONFIRM_THRESHOLD: f64 = 0.50;

const REASONING_QUOTE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// The user stated an absolute constraint ("only", "must", "minimum").
    Hard,
    /// Plausible but not confident enough to commit silently.
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "validation", rename_all = "snake_case")]
pub enum GateDecision {
    Commit,
    Confirm(ValidationKind),
    Discard,
}

impl GateDecision {
    /// The `validated` flag to write, or `None` when nothing should be written.
    pub fn validated(&self) -> Option<bool> {
        match self {
            GateDecision::Commit => Some(true),
            GateDecision::Confirm(_) => Some(false),
            GateDecision::Discard => None,
        }
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(self, GateDecision::Confirm(_))
    }
}

/// Routes a candidate by its extraction signals.
///
/// Hard constraints always go to the user, whatever the confidence. A NaN
/// confidence fails every comparison and is discarded.
pub fn decide(confidence: f64, requires_hard_validation: bool) -> GateDecision {
    if requires_hard_validation {
        return GateDecision::Confirm(ValidationKind::Hard);
    }
    if confidence >= AUTO_COMMIT_THRESHOLD {
        GateDecision::Commit
    } else if confidence >= SOFT_CONFIRM_THRESHOLD {
        GateDecision::Confirm(ValidationKind::Soft)
    } else {
        GateDecision::Discard
    }
}

/// A staged preference surfaced to the user for explicit approval.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationRequest {
    pub id: Uuid,
    pub preference_type: PreferenceType,
    pub cluster: Cluster,
    pub value: String,
    pub confidence: f64,
    pub reasoning: String,
    pub validation_type: ValidationKind,
}

impl ConfirmationRequest {
    pub fn new(candidate: &ExtractedPreference, kind: ValidationKind, user_type: UserType) -> Self {
        let reasoning = match kind {
            ValidationKind::Hard => {
                let quote: String = candidate
                    .raw_text
                    .chars()
                    .take(REASONING_QUOTE_CHARS)
                    .collect();
                let ellipsis = if candidate.raw_text.chars().count() > REASONING_QUOTE_CHARS {
                    "..."
                } else {
                    ""
                };
                format!("You said \"{quote}{ellipsis}\" - confirming this is a strict requirement")
            }
            ValidationKind::Soft => format!(
                "Detected \"{}\" ({}% confidence) - please verify",
                candidate.value,
                (candidate.confidence * 100.0).round() as i64
            ),
        };

        ConfirmationRequest {
            id: Uuid::new_v4(),
            preference_type: candidate.preference_type,
            cluster: candidate.preference_type.cluster_for(user_type),
            value: candidate.value.clone(),
            confidence: candidate.confidence,
            reasoning,
            validation_type: kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(value: &str, confidence: f64, raw_text: &str) -> ExtractedPreference {
        ExtractedPreference {
            preference_type: PreferenceType::Location,
            value: value.to_string(),
            confidence,
            raw_text: raw_text.to_string(),
            requires_hard_validation: false,
        }
    }

    #[test]
    fn test_high_confidence_commits() {
        assert_eq!(decide(0.95, false), GateDecision::Commit);
        assert_eq!(decide(AUTO_COMMIT_THRESHOLD, false), GateDecision::Commit);
    }

    #[test]
    fn test_medium_confidence_asks_softly() {
        assert_eq!(
            decide(0.6, false),
            GateDecision::Confirm(ValidationKind::Soft)
        );
        assert_eq!(
            decide(SOFT_CONFIRM_THRESHOLD, false),
            GateDecision::Confirm(ValidationKind::Soft)
        );
    }

    #[test]
    fn test_low_confidence_discards() {
        assert_eq!(decide(0.49, false), GateDecision::Discard);
        assert_eq!(decide(0.0, false), GateDecision::Discard);
    }

    #[test]
    fn test_hard_constraint_overrides_confidence() {
        assert_eq!(decide(1.0, true), GateDecision::Confirm(ValidationKind::Hard));
        assert_eq!(decide(0.1, true), GateDecision::Confirm(ValidationKind::Hard));
    }

    #[test]
    fn test_nan_confidence_discards() {
        assert_eq!(decide(f64::NAN, false), GateDecision::Discard);
    }

    #[test]
    fn test_validated_flag_per_decision() {
        assert_eq!(GateDecision::Commit.validated(), Some(true));
        assert_eq!(
            GateDecision::Confirm(ValidationKind::Soft).validated(),
            Some(false)
        );
        assert_eq!(GateDecision::Discard.validated(), None);
    }

    #[test]
    fn test_decision_serializes_with_action_tag() {
        let json = serde_json::to_value(GateDecision::Confirm(ValidationKind::Hard)).unwrap();
        assert_eq!(json["action"], "confirm");
        assert_eq!(json["validation"], "hard");

        let json = serde_json::to_value(GateDecision::Commit).unwrap();
        assert_eq!(json["action"], "commit");
    }

    #[test]
    fn test_soft_reasoning_mentions_percentage() {
        let request = ConfirmationRequest::new(
            &candidate("Paris", 0.634, "maybe Paris"),
            ValidationKind::Soft,
            UserType::Candidate,
        );
        assert_eq!(request.reasoning, "Detected \"Paris\" (63% confidence) - please verify");
        assert_eq!(request.cluster, Cluster::Preferences);
    }

    #[test]
    fn test_hard_reasoning_truncates_quote() {
        let long = "I only want to work in London and nowhere else, not even for a great offer";
        let request = ConfirmationRequest::new(
            &candidate("London", 0.9, long),
            ValidationKind::Hard,
            UserType::Client,
        );
        assert!(request.reasoning.starts_with("You said \"I only want to work in London"));
        assert!(request.reasoning.contains("...\""));
        assert_eq!(request.validation_type, ValidationKind::Hard);
    }
}
