//! Preference Store: per-user preference facts with case-insensitive uniqueness.
//!
//! `AppState` holds an `Arc<dyn PreferenceStore>`. Production uses
//! `PgPreferenceStore`; tests run the same contract against an in-memory store.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::preference::{Preference, PreferenceRow, PreferenceType};
use crate::preferences::normalize::normalize_value;

/// A preference about to be written. Construction normalizes the value.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPreference {
    pub user_id: String,
    pub preference_type: PreferenceType,
    pub preference_value: String,
    pub validated: bool,
    pub confidence: Option<f64>,
    pub raw_text: Option<String>,
}

impl NewPreference {
    pub fn new(
        user_id: &str,
        preference_type: PreferenceType,
        value: &str,
        validated: bool,
    ) -> Result<Self, AppError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::Validation("user_id cannot be empty".to_string()));
        }
        let preference_value = normalize_value(preference_type, value).ok_or_else(|| {
            AppError::Validation(format!("Empty value for preference_type '{preference_type}'"))
        })?;

        Ok(NewPreference {
            user_id: user_id.to_string(),
            preference_type,
            preference_value,
            validated,
            confidence: None,
            raw_text: None,
        })
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_raw_text(mut self, raw_text: Option<&str>) -> Self {
        self.raw_text = raw_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        self
    }
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Insert-or-merge on `(user_id, preference_type, lower(value))`.
    ///
    /// On conflict `validated` only ever moves from false to true, `raw_text`
    /// keeps the first non-null value, `confidence` takes the newest non-null
    /// value, and the stored spelling of the value is kept.
    async fn upsert(&self, preference: NewPreference) -> Result<Preference, AppError>;

    /// Hard-deletes the matching preference (value compared case-insensitively).
    /// Returns `None` when nothing matched.
    async fn delete(
        &self,
        user_id: &str,
        preference_type: PreferenceType,
        value: &str,
    ) -> Result<Option<Preference>, AppError>;

    /// All preferences for a user, ordered by type name then newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Preference>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL backend
// ────────────────────────────────────────────────────────────────────────────

pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_preference(row: PreferenceRow) -> Result<Preference, AppError> {
    Preference::try_from(row).map_err(|e| AppError::Internal(anyhow!(e)))
}

/// Merge-on-conflict write. `MemoryPreferenceStore` reproduces these rules.
const UPSERT_SQL: &str = r#"
    INSERT INTO user_repo_preferences
        (user_id, preference_type, preference_value, validated, confidence, raw_text)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (user_id, preference_type, LOWER(preference_value))
    DO UPDATE SET
        validated = GREATEST(user_repo_preferences.validated, EXCLUDED.validated),
        confidence = COALESCE(EXCLUDED.confidence, user_repo_preferences.confidence),
        raw_text = COALESCE(user_repo_preferences.raw_text, EXCLUDED.raw_text),
        updated_at = NOW()
    RETURNING *
"#;

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn upsert(&self, preference: NewPreference) -> Result<Preference, AppError> {
        // Single statement: the unique index and GREATEST merge keep concurrent
        // writers consistent without application-level locking.
        let row = sqlx::query_as::<_, PreferenceRow>(UPSERT_SQL)
        .bind(&preference.user_id)
        .bind(preference.preference_type.as_str())
        .bind(&preference.preference_value)
        .bind(preference.validated)
        .bind(preference.confidence)
        .bind(&preference.raw_text)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            "Upserted preference {} = {} for user {}",
            preference.preference_type, preference.preference_value, preference.user_id
        );
        into_preference(row)
    }

    async fn delete(
        &self,
        user_id: &str,
        preference_type: PreferenceType,
        value: &str,
    ) -> Result<Option<Preference>, AppError> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"
            DELETE FROM user_repo_preferences
            WHERE user_id = $1
              AND preference_type = $2
              AND LOWER(preference_value) = LOWER($3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(preference_type.as_str())
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = &row {
            info!(
                "Deleted preference {} ({} = {}) for user {user_id}",
                row.id, row.preference_type, row.preference_value
            );
        }
        row.map(into_preference).transpose()
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Preference>, AppError> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT *
            FROM user_repo_preferences
            WHERE user_id = $1
            ORDER BY preference_type, created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_preference).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listing view
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceSummary {
    pub value: String,
    pub validated: bool,
}

/// Groups preferences by type name, preserving the input order inside each group.
pub fn group_by_type(preferences: &[Preference]) -> BTreeMap<String, Vec<PreferenceSummary>> {
    let mut grouped: BTreeMap<String, Vec<PreferenceSummary>> = BTreeMap::new();
    for preference in preferences {
        grouped
            .entry(preference.preference_type.as_str().to_string())
            .or_default()
            .push(PreferenceSummary {
                value: preference.preference_value.clone(),
                validated: preference.validated,
            });
    }
    grouped
}
