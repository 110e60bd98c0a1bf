use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::extraction::PreferenceExtractor;
use crate::jobs::sync::JobSync;
use crate::preferences::store::PreferenceStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable preference store. Production: `PgPreferenceStore`.
    pub preferences: Arc<dyn PreferenceStore>,
    pub extractor: PreferenceExtractor,
    /// `None` when no Apify key is configured; the sync endpoint then answers 500.
    pub job_sync: Option<Arc<JobSync>>,
    pub config: Config,
    /// Cancelled on server shutdown. Long-running work takes a child token.
    pub shutdown: CancellationToken,
}

#[cfg(test)]
impl AppState {
    /// State backed by the in-memory store, fallback-only extraction and no job sync.
    pub fn in_memory() -> Self {
        AppState {
            preferences: Arc::new(crate::preferences::memory::MemoryPreferenceStore::default()),
            extractor: PreferenceExtractor::default(),
            job_sync: None,
            config: Config::for_tests(),
            shutdown: CancellationToken::new(),
        }
    }
}
