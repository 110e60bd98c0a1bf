use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::preference::{Preference, PreferenceType};
use crate::preferences::gate::{decide, GateDecision};
use crate::preferences::normalize::normalize_value;
use crate::preferences::store::{group_by_type, NewPreference, PreferenceSummary};
use crate::state::AppState;

/// Request bodies keep every field optional so that a missing field is
/// reported as a 400 with the field name rather than a generic rejection.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Missing required field '{field}'")))
}

pub(crate) fn parse_preference_type(value: Option<String>) -> Result<PreferenceType, AppError> {
    required(value, "preference_type")?
        .parse()
        .map_err(AppError::Validation)
}

#[derive(Deserialize)]
pub struct SavePreferencesRequest {
    pub user_id: Option<String>,
    pub preference_type: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub requires_hard_validation: bool,
    pub raw_text: Option<String>,
}

#[derive(Serialize)]
pub struct SavePreferencesResponse {
    pub success: bool,
    pub saved: Vec<Preference>,
    pub decision: GateDecision,
}

/// POST /preferences
///
/// The `validated` flag is decided by the confirmation gate from
/// `confidence` and `requires_hard_validation`; a client-sent `validated`
/// field is ignored.
pub async fn handle_save_preferences(
    State(state): State<AppState>,
    Json(req): Json<SavePreferencesRequest>,
) -> Result<Json<SavePreferencesResponse>, AppError> {
    let user_id = required(req.user_id, "user_id")?;
    let preference_type = parse_preference_type(req.preference_type)?;
    let confidence = req
        .confidence
        .ok_or_else(|| AppError::Validation("Missing required field 'confidence'".to_string()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(AppError::Validation(format!(
            "confidence must be between 0 and 1, got {confidence}"
        )));
    }

    let values: Vec<&str> = req
        .values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(AppError::Validation(
            "values must contain at least one non-empty value".to_string(),
        ));
    }

    let decision = decide(confidence, req.requires_hard_validation);
    let Some(validated) = decision.validated() else {
        info!(
            "Discarded {} {preference_type} value(s) for user {user_id} (confidence {confidence:.2})",
            values.len()
        );
        return Ok(Json(SavePreferencesResponse {
            success: true,
            saved: Vec::new(),
            decision,
        }));
    };

    let mut saved = Vec::with_capacity(values.len());
    for value in values {
        let preference = NewPreference::new(&user_id, preference_type, value, validated)?
            .with_confidence(confidence)
            .with_raw_text(req.raw_text.as_deref());
        saved.push(state.preferences.upsert(preference).await?);
    }

    info!(
        "Saved {} {preference_type} preference(s) for user {user_id} (validated={validated})",
        saved.len()
    );
    Ok(Json(SavePreferencesResponse {
        success: true,
        saved,
        decision,
    }))
}

#[derive(Deserialize)]
pub struct PreferenceKeyRequest {
    pub user_id: Option<String>,
    pub preference_type: Option<String>,
    pub preference_value: Option<String>,
}

#[derive(Serialize)]
pub struct ConfirmPreferenceResponse {
    pub success: bool,
    pub saved: Preference,
}

/// POST /preferences/confirm
pub async fn handle_confirm_preference(
    State(state): State<AppState>,
    Json(req): Json<PreferenceKeyRequest>,
) -> Result<Json<ConfirmPreferenceResponse>, AppError> {
    let user_id = required(req.user_id, "user_id")?;
    let preference_type = parse_preference_type(req.preference_type)?;
    let value = required(req.preference_value, "preference_value")?;

    let saved = state
        .preferences
        .upsert(NewPreference::new(&user_id, preference_type, &value, true)?)
        .await?;

    info!("User {user_id} confirmed {preference_type} = {}", saved.preference_value);
    Ok(Json(ConfirmPreferenceResponse {
        success: true,
        saved,
    }))
}

#[derive(Deserialize)]
pub struct ListPreferencesQuery {
    pub user_id: Option<String>,
    #[serde(default)]
    pub validated_only: bool,
}

#[derive(Serialize)]
pub struct ListPreferencesResponse {
    pub preferences: std::collections::BTreeMap<String, Vec<PreferenceSummary>>,
    pub count: usize,
}

/// GET /preferences?user_id=&validated_only=
pub async fn handle_list_preferences(
    State(state): State<AppState>,
    Query(params): Query<ListPreferencesQuery>,
) -> Result<Json<ListPreferencesResponse>, AppError> {
    let user_id = required(params.user_id, "user_id")?;

    let mut preferences = state.preferences.list(&user_id).await?;
    if params.validated_only {
        preferences.retain(|p| p.validated);
    }

    Ok(Json(ListPreferencesResponse {
        count: preferences.len(),
        preferences: group_by_type(&preferences),
    }))
}

#[derive(Serialize)]
pub struct DeletePreferenceResponse {
    pub success: bool,
    pub deleted: Preference,
}

/// DELETE /preferences
pub async fn handle_delete_preference(
    State(state): State<AppState>,
    Json(req): Json<PreferenceKeyRequest>,
) -> Result<Json<DeletePreferenceResponse>, AppError> {
    let user_id = required(req.user_id, "user_id")?;
    let preference_type = parse_preference_type(req.preference_type)?;
    let value = required(req.preference_value, "preference_value")?;
    // Match the spelling that writes stored.
    let value = normalize_value(preference_type, &value).ok_or_else(|| {
        AppError::Validation("Missing required field 'preference_value'".to_string())
    })?;

    let deleted = state
        .preferences
        .delete(&user_id, preference_type, &value)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No {preference_type} preference '{value}' for this user"))
        })?;

    Ok(Json(DeletePreferenceResponse {
        success: true,
        deleted,
    }))
}
