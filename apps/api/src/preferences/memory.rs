use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;
use crate::models::preference::{Preference, PreferenceType};
use crate::preferences::store::{NewPreference, PreferenceStore};

/// In-memory `PreferenceStore` with the same merge rules as the Postgres upsert.
///
/// Mirrors `UPSERT_SQL` in `store.rs` clause for clause: `validated` is
/// `GREATEST` (never downgraded), a new `confidence` wins via `COALESCE`, the
/// first `raw_text` is kept, and the key is `(user_id, type, LOWER(value))`.
/// Any change to that statement must be made here too.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<Preference>,
    next_id: i64,
}

fn same_key(p: &Preference, user_id: &str, t: PreferenceType, value: &str) -> bool {
    p.user_id == user_id
        && p.preference_type == t
        && p.preference_value.to_lowercase() == value.to_lowercase()
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn upsert(&self, preference: NewPreference) -> Result<Preference, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = inner.rows.iter_mut().find(|p| {
            same_key(
                p,
                &preference.user_id,
                preference.preference_type,
                &preference.preference_value,
            )
        }) {
            existing.validated = existing.validated || preference.validated;
            existing.confidence = preference.confidence.or(existing.confidence);
            if existing.raw_text.is_none() {
                existing.raw_text = preference.raw_text;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let stored = Preference {
            id: inner.next_id,
            user_id: preference.user_id,
            preference_type: preference.preference_type,
            preference_value: preference.preference_value,
            validated: preference.validated,
            confidence: preference.confidence,
            raw_text: preference.raw_text,
            created_at: now,
            updated_at: now,
        };
        inner.rows.push(stored.clone());
        Ok(stored)
    }

    async fn delete(
        &self,
        user_id: &str,
        preference_type: PreferenceType,
        value: &str,
    ) -> Result<Option<Preference>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .rows
            .iter()
            .position(|p| same_key(p, user_id, preference_type, value));
        Ok(position.map(|i| inner.rows.remove(i)))
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Preference>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Preference> = inner
            .rows
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.preference_type
                .as_str()
                .cmp(b.preference_type.as_str())
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }
}
