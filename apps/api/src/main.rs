mod config;
mod db;
mod errors;
mod extraction;
mod graph;
mod jobs;
mod models;
mod preferences;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod voice;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::extraction::remote::RemoteExtractor;
use crate::extraction::{ExtractionBackend, PreferenceExtractor};
use crate::jobs::apify::ApifyClient;
use crate::jobs::poller::BackoffPolicy;
use crate::jobs::sync::JobSync;
use crate::preferences::store::PgPreferenceStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Quest API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL; the pool is shared by every component below
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    let preferences = Arc::new(PgPreferenceStore::new(db.clone()));

    // Remote extraction is optional; without it only the local matcher runs
    let remote: Option<Arc<dyn ExtractionBackend>> = match &config.extraction_service_url {
        Some(url) => {
            let client: Arc<dyn ExtractionBackend> = Arc::new(RemoteExtractor::new(
                url.clone(),
                config.extraction_api_key.clone(),
            )?);
            info!("Remote extraction enabled ({url})");
            Some(client)
        }
        None => {
            warn!("EXTRACTION_SERVICE_URL not set, using local fallback extraction only");
            None
        }
    };
    let extractor = PreferenceExtractor::new(remote);

    let job_sync = match &config.apify_api_key {
        Some(key) => {
            let apify = ApifyClient::new(key.clone())?;
            let policy = BackoffPolicy::with_deadline(config.sync_poll_deadline);
            info!(
                "Job sync enabled (task {}, poll deadline {:?})",
                config.apify_task_id, policy.deadline
            );
            Some(Arc::new(JobSync::new(
                apify,
                config.apify_task_id.clone(),
                db.clone(),
                policy,
            )))
        }
        None => {
            warn!("APIFY_API_KEY not set, /cron/sync-jobs will fail");
            None
        }
    };

    let shutdown = CancellationToken::new();

    // Build app state
    let state = AppState {
        preferences,
        extractor,
        job_sync,
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels in-flight background work.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
