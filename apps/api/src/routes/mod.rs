pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::graph::handlers as graph;
use crate::jobs::handlers as jobs;
use crate::preferences::handlers as preferences;
use crate::state::AppState;
use crate::voice::handlers as voice;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Preference capture
        .route(
            "/preferences",
            get(preferences::handle_list_preferences)
                .post(preferences::handle_save_preferences)
                .delete(preferences::handle_delete_preference),
        )
        .route(
            "/preferences/confirm",
            post(preferences::handle_confirm_preference),
        )
        .route("/voice-extract", post(voice::handle_voice_extract))
        .route("/voice-to-graph", post(voice::handle_voice_to_graph))
        // Graph projection
        .route("/graph", get(graph::handle_get_graph))
        // Scheduled sync
        .route("/cron/sync-jobs", get(jobs::handle_sync_jobs))
        .with_state(state)
}
