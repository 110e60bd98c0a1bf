use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base URL of the remote extraction gateway. Unset means fallback-only extraction.
    pub extraction_service_url: Option<String>,
    pub extraction_api_key: Option<String>,
    /// Shared secret the scheduler presents as a bearer token on `/cron/*`.
    pub cron_secret: Option<String>,
    pub apify_api_key: Option<String>,
    pub apify_task_id: String,
    pub sync_poll_deadline: Duration,
    pub port: u16,
    pub rust_log: String,
}

const DEFAULT_APIFY_TASK_ID: &str = "eCRqlhiXr9ANbXDUt";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            extraction_service_url: optional_env("EXTRACTION_SERVICE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            extraction_api_key: optional_env("EXTRACTION_API_KEY"),
            cron_secret: optional_env("CRON_SECRET"),
            apify_api_key: optional_env("APIFY_API_KEY"),
            apify_task_id: optional_env("APIFY_TASK_ID")
                .unwrap_or_else(|| DEFAULT_APIFY_TASK_ID.to_string()),
            sync_poll_deadline: Duration::from_secs(
                std::env::var("SYNC_POLL_DEADLINE_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse::<u64>()
                    .context("SYNC_POLL_DEADLINE_SECS must be a whole number of seconds")?,
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, treating an empty value the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
impl Config {
    /// Configuration with every optional collaborator switched off.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/quest_test".to_string(),
            extraction_service_url: None,
            extraction_api_key: None,
            cron_secret: None,
            apify_api_key: None,
            apify_task_id: DEFAULT_APIFY_TASK_ID.to_string(),
            sync_poll_deadline: Duration::from_secs(300),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}
