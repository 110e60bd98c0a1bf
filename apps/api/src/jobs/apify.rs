/// Minimal client for the Apify REST API: start an actor task, read a run,
/// and fetch the run's dataset.
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::errors::AppError;

const APIFY_API_BASE: &str = "https://api.apify.com/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Apify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Apify response is missing {0}")]
    MissingField(&'static str),
}

impl From<ApifyError> for AppError {
    fn from(e: ApifyError) -> Self {
        AppError::Upstream(e.to_string())
    }
}

/// Lifecycle states of an actor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    TimingOut,
    TimedOut,
    Aborting,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// The run will not change state again.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            RunStatus::Ready | RunStatus::Running | RunStatus::TimingOut | RunStatus::Aborting
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: String,
    pub status: RunStatus,
    pub default_dataset_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Clone)]
pub struct ApifyClient {
    client: Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Result<Self, ApifyError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            token,
        })
    }

    /// POST /actor-tasks/{task_id}/runs
    pub async fn start_task_run(&self, task_id: &str) -> Result<RunInfo, ApifyError> {
        let request = self
            .client
            .post(format!("{APIFY_API_BASE}/actor-tasks/{task_id}/runs"));
        let envelope: Envelope<RunInfo> = self.send(request).await?;
        Ok(envelope.data)
    }

    /// GET /actor-runs/{run_id}
    pub async fn get_run(&self, run_id: &str) -> Result<RunInfo, ApifyError> {
        let request = self.client.get(format!("{APIFY_API_BASE}/actor-runs/{run_id}"));
        let envelope: Envelope<RunInfo> = self.send(request).await?;
        Ok(envelope.data)
    }

    /// GET /datasets/{dataset_id}/items
    ///
    /// Items come back undecoded so that one malformed listing cannot sink
    /// the batch; see `decode_listings`.
    pub async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, ApifyError> {
        let request = self
            .client
            .get(format!("{APIFY_API_BASE}/datasets/{dataset_id}/items"))
            .query(&[("clean", "true")]);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApifyError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Apify API returned {status}: {body}");
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.json().await?)
    }
}
