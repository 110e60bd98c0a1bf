use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One listing as returned by the aggregation dataset. Actors disagree on
/// field names, so most fields have an alternate spelling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApifyJob {
    pub title: Option<String>,
    pub company: Option<String>,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub source_url: Option<String>,
    pub posted_date: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub compensation: Option<String>,
    pub is_remote: Option<bool>,
    pub workplace_type: Option<String>,
}

/// A listing ready to be written to the `jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedJob {
    pub slug: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub is_remote: bool,
    pub compensation: Option<String>,
    pub role_category: Option<String>,
    pub description_snippet: Option<String>,
    pub posted_date: DateTime<Utc>,
    pub source_url: String,
}
