use anyhow::anyhow;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};

use crate::errors::AppError;
use crate::jobs::sync::SyncReport;
use crate::state::AppState;

/// Accepts the request when no secret is configured, or when it carries
/// `Authorization: Bearer {secret}`.
pub fn authorize_cron(headers: &HeaderMap, secret: Option<&str>) -> Result<(), AppError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(secret) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// GET /cron/sync-jobs
pub async fn handle_sync_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncReport>, AppError> {
    authorize_cron(&headers, state.config.cron_secret.as_deref())?;

    let sync = state
        .job_sync
        .as_ref()
        .ok_or_else(|| AppError::Internal(anyhow!("APIFY_API_KEY environment variable not set")))?;

    // Server shutdown cancels the poll; so does dropping this request.
    let cancel = state.shutdown.child_token();
    let report = sync.run(&cancel).await?;
    Ok(Json(report))
}
