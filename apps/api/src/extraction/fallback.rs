//! Local fallback extraction: deterministic keyword and pattern matching.
//!
//! Low recall, high precision. A category with no match simply contributes no
//! candidate; this path never fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::extraction::ExtractedPreference;
use crate::models::preference::PreferenceType;
use crate::preferences::normalize::normalize_value;

const ROLES: &[&str] = &[
    "CEO", "CFO", "CTO", "CMO", "COO", "CPO", "CRO", "CISO", "CHRO", "VP", "Director", "Manager",
    "Head of",
];

const LOCATIONS: &[&str] = &[
    "London",
    "Manchester",
    "Edinburgh",
    "Birmingham",
    "Bristol",
    "Leeds",
    "Paris",
    "Berlin",
    "Amsterdam",
    "Dublin",
    "New York",
    "Singapore",
    "Dubai",
    "Remote",
];

const SKILLS: &[&str] = &[
    "M&A",
    "Fundraising",
    "FP&A",
    "Strategy",
    "Leadership",
    "Board Relations",
    "Risk Management",
];

const COMPANIES: &[&str] = &[
    "Google",
    "Apple",
    "Microsoft",
    "Amazon",
    "Meta",
    "Stripe",
    "Revolut",
    "Monzo",
    "Wise",
    "Klarna",
    "N26",
];

const ROLE_CONFIDENCE: f64 = 0.8;
const LOCATION_CONFIDENCE: f64 = 0.9;
const DAY_RATE_CONFIDENCE: f64 = 0.9;
const AVAILABILITY_CONFIDENCE: f64 = 0.7;
const SKILL_CONFIDENCE: f64 = 0.6;
const COMPANY_CONFIDENCE: f64 = 0.6;

/// Builds a word-bounded alternation over `terms`, longest first so that
/// multi-word terms win over their prefixes.
fn vocabulary_regex(terms: &[&str], case_insensitive: bool) -> Regex {
    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = sorted
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let flags = if case_insensitive { "(?i)" } else { "" };
    Regex::new(&format!(r"{flags}\b(?:{alternation})\b")).expect("vocabulary pattern is valid")
}

static ROLE_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(ROLES, true));
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(LOCATIONS, true));
static SKILL_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(SKILLS, true));
// Company names double as ordinary words ("wise", "apple"), so only the
// capitalised spelling counts.
static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| vocabulary_regex(COMPANIES, false));

static DAY_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([£$€])\s?(\d{1,3}(?:,\d{3})+|\d+)|\b(\d{1,3}(?:,\d{3})+|\d+)\s*(?:per\s+day|a\s+day|/\s*day|p/d|day\s+rate)",
    )
    .expect("day rate pattern is valid")
});

static AVAILABILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([1-7])\s*days?\s*(?:a\s+|per\s+|/\s*)week\b")
        .expect("availability pattern is valid")
});

static LOCATION_HARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:must|only)\b").expect("location constraint pattern is valid"));

static DAY_RATE_HARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:minimum|at\s+least)\b").expect("day rate constraint pattern is valid")
});

/// Extracts candidates in a fixed category order: role, location, day rate,
/// availability, skill, company.
pub fn extract(utterance: &str) -> Vec<ExtractedPreference> {
    let raw_text = utterance.trim();
    let mut candidates = Vec::new();

    let mut push = |preference_type: PreferenceType, value: &str, confidence: f64, hard: bool| {
        if let Some(value) = normalize_value(preference_type, value) {
            candidates.push(ExtractedPreference {
                preference_type,
                value,
                confidence,
                raw_text: raw_text.to_string(),
                requires_hard_validation: hard,
            });
        }
    };

    for role in match_vocabulary(&ROLE_RE, ROLES, raw_text) {
        push(PreferenceType::Role, role, ROLE_CONFIDENCE, false);
    }

    let location_is_hard = LOCATION_HARD_RE.is_match(raw_text);
    for location in match_vocabulary(&LOCATION_RE, LOCATIONS, raw_text) {
        push(
            PreferenceType::Location,
            location,
            LOCATION_CONFIDENCE,
            location_is_hard,
        );
    }

    if let Some(rate) = match_day_rate(raw_text) {
        push(
            PreferenceType::DayRate,
            &rate,
            DAY_RATE_CONFIDENCE,
            DAY_RATE_HARD_RE.is_match(raw_text),
        );
    }

    if let Some(availability) = match_availability(raw_text) {
        push(
            PreferenceType::Availability,
            &availability,
            AVAILABILITY_CONFIDENCE,
            false,
        );
    }

    for skill in match_vocabulary(&SKILL_RE, SKILLS, raw_text) {
        push(PreferenceType::Skill, skill, SKILL_CONFIDENCE, false);
    }

    for company in match_vocabulary(&COMPANY_RE, COMPANIES, raw_text) {
        push(PreferenceType::Company, company, COMPANY_CONFIDENCE, false);
    }

    candidates
}

/// Returns the canonical vocabulary spelling of each distinct match, in order
/// of first occurrence.
fn match_vocabulary(
    re: &Regex,
    terms: &[&'static str],
    text: &str,
) -> Vec<&'static str> {
    let mut found: Vec<&'static str> = Vec::new();
    for m in re.find_iter(text) {
        let matched = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        let canonical = terms.iter().find(|t| t.eq_ignore_ascii_case(&matched));
        if let Some(&term) = canonical {
            if !found.contains(&term) {
                found.push(term);
            }
        }
    }
    found
}

/// First currency amount (or per-day amount) in the text, e.g. `£1200`.
/// Thousands separators are dropped; a bare amount defaults to pounds.
fn match_day_rate(text: &str) -> Option<String> {
    let caps = DAY_RATE_RE.captures(text)?;
    let (currency, amount) = match (caps.get(1), caps.get(2)) {
        (Some(currency), Some(amount)) => (currency.as_str(), amount.as_str()),
        _ => ("£", caps.get(3)?.as_str()),
    };
    Some(format!("{currency}{}", amount.replace(',', "")))
}

fn match_availability(text: &str) -> Option<String> {
    let days: u8 = AVAILABILITY_RE.captures(text)?.get(1)?.as_str().parse().ok()?;
    let unit = if days == 1 { "day" } else { "days" };
    Some(format!("{days} {unit}/week"))
}
