use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::jobs::apify::{ApifyClient, ApifyError, RunStatus};
use crate::jobs::normalize::normalize_job;
use crate::jobs::poller::{poll_until, BackoffPolicy, PollError, PollStatus};
use crate::models::job::{ApifyJob, NormalizedJob};

pub const JOB_SOURCE: &str = "Apify";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
}

impl SyncReport {
    fn unsuccessful(message: String, run_id: &str) -> Self {
        SyncReport {
            success: false,
            message,
            stats: SyncStats {
                run_id: Some(run_id.to_string()),
                ..SyncStats::default()
            },
        }
    }
}

/// Runs the Apify task, waits for it, and upserts the results.
pub struct JobSync {
    apify: ApifyClient,
    task_id: String,
    pool: PgPool,
    policy: BackoffPolicy,
}

impl JobSync {
    pub fn new(apify: ApifyClient, task_id: String, pool: PgPool, policy: BackoffPolicy) -> Self {
        Self {
            apify,
            task_id,
            pool,
            policy,
        }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport, AppError> {
        info!("Starting Apify job sync (task {})", self.task_id);

        let started = self.apify.start_task_run(&self.task_id).await?;
        info!("Apify task started with run ID {}", started.id);

        let run = if started.status.is_terminal() {
            started
        } else {
            let apify = &self.apify;
            let run_id = started.id.as_str();
            let polled = poll_until(&self.policy, cancel, move |attempt| async move {
                let run = apify.get_run(run_id).await?;
                info!("Apify run {run_id} status {:?} (attempt {attempt})", run.status);
                Ok::<_, ApifyError>(if run.status.is_terminal() {
                    PollStatus::Ready(run)
                } else {
                    PollStatus::Pending
                })
            })
            .await;

            match polled {
                Ok(run) => run,
                Err(PollError::Check(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("Apify run {} not awaited: {e}", started.id);
                    return Ok(SyncReport::unsuccessful(
                        format!("Apify run did not finish: {e}"),
                        &started.id,
                    ));
                }
            }
        };

        if run.status != RunStatus::Succeeded {
            return Ok(SyncReport::unsuccessful(
                format!(
                    "Apify run did not complete successfully. Status: {:?}",
                    run.status
                ),
                &run.id,
            ));
        }

        let dataset_id = run
            .default_dataset_id
            .as_deref()
            .ok_or(ApifyError::MissingField("defaultDatasetId"))?;
        let items = self.apify.dataset_items(dataset_id).await?;
        info!("Fetched {} jobs from Apify", items.len());

        let mut stats = SyncStats {
            fetched: items.len(),
            run_id: Some(run.id.clone()),
            ..SyncStats::default()
        };
        if items.is_empty() {
            return Ok(SyncReport {
                success: true,
                message: "No jobs found in Apify dataset".to_string(),
                stats,
            });
        }

        let (listings, malformed) = decode_listings(items);
        stats.skipped += malformed;

        let now = Utc::now();
        for item in &listings {
            let Some(job) = normalize_job(item, now) else {
                stats.skipped += 1;
                continue;
            };
            match upsert_job(&self.pool, &job).await {
                Ok(true) => stats.inserted += 1,
                Ok(false) => stats.updated += 1,
                Err(e) => {
                    warn!("Failed to upsert job '{}': {e}", job.title);
                    stats.skipped += 1;
                }
            }
        }

        info!(
            "Apify job sync complete: fetched={} inserted={} updated={} skipped={}",
            stats.fetched, stats.inserted, stats.updated, stats.skipped
        );
        Ok(SyncReport {
            success: true,
            message: format!(
                "Synced {} new jobs, updated {}, skipped {}",
                stats.inserted, stats.updated, stats.skipped
            ),
            stats,
        })
    }
}

/// Decodes dataset items one by one. Returns the listings that decoded and
/// the number that did not.
fn decode_listings(items: Vec<Value>) -> (Vec<ApifyJob>, usize) {
    let mut listings = Vec::with_capacity(items.len());
    let mut malformed = 0;
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ApifyJob>(item) {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                warn!("Skipping malformed Apify item {index}: {e}");
                malformed += 1;
            }
        }
    }
    (listings, malformed)
}

/// Inserts or refreshes a listing keyed on its source URL.
/// Returns `true` when a new row was inserted.
async fn upsert_job(pool: &PgPool, job: &NormalizedJob) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO jobs
            (slug, title, company_name, location, is_remote, compensation,
             role_category, description_snippet, posted_date, source_url,
             job_source, is_active, is_fractional)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, true, true)
        ON CONFLICT (source_url) DO UPDATE SET
            title = EXCLUDED.title,
            company_name = EXCLUDED.company_name,
            location = EXCLUDED.location,
            is_remote = EXCLUDED.is_remote,
            compensation = EXCLUDED.compensation,
            role_category = EXCLUDED.role_category,
            description_snippet = EXCLUDED.description_snippet,
            posted_date = EXCLUDED.posted_date,
            is_active = true,
            updated_at = NOW()
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(&job.slug)
    .bind(&job.title)
    .bind(&job.company_name)
    .bind(&job.location)
    .bind(job.is_remote)
    .bind(&job.compensation)
    .bind(&job.role_category)
    .bind(&job.description_snippet)
    .bind(job.posted_date)
    .bind(&job.source_url)
    .bind(JOB_SOURCE)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unsuccessful_report_carries_run_id() {
        let report = SyncReport::unsuccessful("cancelled after 2 attempts".to_string(), "run-7");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["stats"]["run_id"], "run-7");
        assert_eq!(json["stats"]["inserted"], 0);
    }

    #[test]
    fn test_stats_omit_missing_run_id() {
        let json = serde_json::to_value(SyncStats::default()).unwrap();
        assert!(json.get("run_id").is_none());
    }

    #[test]
    fn test_malformed_items_are_skipped_not_fatal() {
        let items = vec![
            json!({"title": "Fractional CFO", "url": "https://example.com/cfo", "is_remote": true}),
            json!({"title": "CMO", "url": "https://example.com/cmo", "is_remote": "yes"}),
            json!("not an object"),
            json!({"title": "Interim CTO", "url": "https://example.com/cto"}),
        ];

        let (listings, malformed) = decode_listings(items);

        assert_eq!(malformed, 2);
        let titles: Vec<_> = listings.iter().filter_map(|l| l.title.as_deref()).collect();
        assert_eq!(titles, vec!["Fractional CFO", "Interim CTO"]);
        assert_eq!(listings[0].is_remote, Some(true));
    }
}
