use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::extraction::ExtractedPreference;
use crate::models::preference::{PreferenceType, UserType};
use crate::preferences::gate::{decide, GateDecision};
use crate::preferences::handlers::required;
use crate::state::AppState;
use crate::voice::pipeline::{capture, CaptureOutcome};

#[derive(Deserialize)]
pub struct VoiceExtractRequest {
    pub transcript: Option<String>,
}

/// A candidate in the shape the capture UI consumes, with the gate's verdict.
#[derive(Serialize)]
pub struct CandidateView {
    #[serde(rename = "type")]
    pub preference_type: PreferenceType,
    pub values: Vec<String>,
    pub confidence: f64,
    pub raw_text: String,
    pub requires_hard_validation: bool,
    pub decision: GateDecision,
}

impl From<ExtractedPreference> for CandidateView {
    fn from(c: ExtractedPreference) -> Self {
        CandidateView {
            decision: decide(c.confidence, c.requires_hard_validation),
            preference_type: c.preference_type,
            values: vec![c.value],
            confidence: c.confidence,
            raw_text: c.raw_text,
            requires_hard_validation: c.requires_hard_validation,
        }
    }
}

#[derive(Serialize)]
pub struct VoiceExtractResponse {
    pub preferences: Vec<CandidateView>,
    /// True when at least one candidate needs the user's confirmation.
    pub should_confirm: bool,
    pub fallback: bool,
}

/// POST /voice-extract
///
/// Extraction only; nothing is written.
pub async fn handle_voice_extract(
    State(state): State<AppState>,
    Json(req): Json<VoiceExtractRequest>,
) -> Result<Json<VoiceExtractResponse>, AppError> {
    let transcript = required(req.transcript, "transcript")?;
    let extraction = state.extractor.extract(&transcript).await;

    let preferences: Vec<CandidateView> = extraction
        .candidates
        .into_iter()
        .map(CandidateView::from)
        .collect();
    let should_confirm = preferences.iter().any(|p| p.decision.needs_confirmation());

    Ok(Json(VoiceExtractResponse {
        preferences,
        should_confirm,
        fallback: extraction.fallback,
    }))
}

#[derive(Deserialize)]
pub struct VoiceToGraphRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    pub transcript: Option<String>,
    /// `candidate` (default) or `client`.
    #[serde(alias = "userType")]
    pub user_type: Option<String>,
}

/// POST /voice-to-graph
pub async fn handle_voice_to_graph(
    State(state): State<AppState>,
    Json(req): Json<VoiceToGraphRequest>,
) -> Result<Json<CaptureOutcome>, AppError> {
    let user_id = required(req.user_id, "user_id")?;
    let transcript = required(req.transcript, "transcript")?;
    let user_type = match req.user_type {
        Some(t) => t.parse::<UserType>().map_err(AppError::Validation)?,
        None => UserType::default(),
    };

    let outcome = capture(
        state.preferences.as_ref(),
        &state.extractor,
        &user_id,
        &transcript,
        user_type,
    )
    .await?;
    Ok(Json(outcome))
}
