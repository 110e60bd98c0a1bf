use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::models::job::{ApifyJob, NormalizedJob};

pub const DEFAULT_COMPANY: &str = "Unknown Company";
pub const DEFAULT_LOCATION: &str = "UK";
const SNIPPET_CHARS: usize = 500;
const SLUG_BASE_CHARS: usize = 80;

/// Title patterns checked in order; the first hit names the category.
static ROLE_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bcfo\b|chief financial", "CFO"),
        (r"\bcto\b|chief technology", "CTO"),
        (r"\bcmo\b|chief marketing", "CMO"),
        (r"\bcoo\b|chief operating", "COO"),
        (r"\bchro\b|chief human|chief people|\bhr director", "CHRO"),
        (r"\bcpo\b|chief product", "CPO"),
        (r"\bciso\b|chief information security", "CISO"),
        (r"finance director|\bfd\b", "CFO"),
        (r"marketing director", "CMO"),
        (r"tech lead|head of engineering|engineering director", "CTO"),
    ]
    .into_iter()
    .map(|(pattern, category)| {
        let re = Regex::new(&format!("(?i){pattern}")).expect("role rule is valid");
        (re, category)
    })
    .collect()
});

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

pub fn detect_role_category(title: &str) -> Option<&'static str> {
    ROLE_RULES
        .iter()
        .find(|(re, _)| re.is_match(title))
        .map(|(_, category)| *category)
}

/// Lower-case, hyphen-separated, at most 80 characters.
pub fn slugify(title: &str, company: &str) -> String {
    let combined = format!("{title} {company}").to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&combined, "-");
    // Only ASCII remains, so byte truncation is safe.
    let slug = slug.trim_matches('-');
    let slug = &slug[..slug.len().min(SLUG_BASE_CHARS)];
    slug.trim_end_matches('-').to_string()
}

/// Slug plus a suffix derived from the source URL, so re-syncing the same
/// listing always produces the same slug.
pub fn job_slug(title: &str, company: &str, source_url: &str) -> String {
    let hash = Uuid::new_v5(&Uuid::NAMESPACE_URL, source_url.as_bytes()).simple().to_string();
    let suffix = &hash[..8];
    let base = slugify(title, company);
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{base}-{suffix}")
    }
}

fn first_non_blank<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
}

fn parse_posted_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Maps a raw listing to a `jobs` row. Listings without a title or a URL are
/// skipped (`None`).
pub fn normalize_job(job: &ApifyJob, now: DateTime<Utc>) -> Option<NormalizedJob> {
    let title = first_non_blank(&[&job.title])?;
    let source_url = first_non_blank(&[&job.url, &job.source_url])?;
    let company = first_non_blank(&[&job.company, &job.company_name]).unwrap_or(DEFAULT_COMPANY);
    let location = first_non_blank(&[&job.location]).unwrap_or(DEFAULT_LOCATION);

    let is_remote = job.is_remote.unwrap_or(false)
        || job
            .workplace_type
            .as_deref()
            .is_some_and(|w| w.to_lowercase().contains("remote"));

    let description_snippet = first_non_blank(&[&job.description])
        .map(|d| d.chars().take(SNIPPET_CHARS).collect::<String>());

    Some(NormalizedJob {
        slug: job_slug(title, company, source_url),
        title: title.to_string(),
        company_name: company.to_string(),
        location: location.to_string(),
        is_remote,
        compensation: first_non_blank(&[&job.salary, &job.compensation]).map(String::from),
        role_category: detect_role_category(title).map(String::from),
        description_snippet,
        posted_date: parse_posted_date(job.posted_date.as_deref()).unwrap_or(now),
        source_url: source_url.to_string(),
    })
}
