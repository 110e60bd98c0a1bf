use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The kind of fact a preference records about a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceType {
    Role,
    Location,
    DayRate,
    Skill,
    Availability,
    Company,
    Industry,
}

impl PreferenceType {
    pub const ALL: [PreferenceType; 7] = [
        PreferenceType::Role,
        PreferenceType::Location,
        PreferenceType::DayRate,
        PreferenceType::Skill,
        PreferenceType::Availability,
        PreferenceType::Company,
        PreferenceType::Industry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceType::Role => "role",
            PreferenceType::Location => "location",
            PreferenceType::DayRate => "day_rate",
            PreferenceType::Skill => "skill",
            PreferenceType::Availability => "availability",
            PreferenceType::Company => "company",
            PreferenceType::Industry => "industry",
        }
    }

    /// Visualization cluster the graph UI groups this type under.
    pub fn cluster(&self) -> Cluster {
        self.cluster_for(UserType::Candidate)
    }

    /// A client's role is a hiring requirement rather than a career interest.
    pub fn cluster_for(&self, user_type: UserType) -> Cluster {
        match self {
            PreferenceType::Role if user_type == UserType::Client => Cluster::Requirements,
            PreferenceType::Skill => Cluster::Skills,
            PreferenceType::Company => Cluster::Experience,
            PreferenceType::Role => Cluster::CareerInterests,
            PreferenceType::Location
            | PreferenceType::DayRate
            | PreferenceType::Availability
            | PreferenceType::Industry => Cluster::Preferences,
        }
    }
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreferenceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown preference_type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    Skills,
    Experience,
    CareerInterests,
    Requirements,
    Preferences,
}

/// Who is speaking: an executive looking for work or a company hiring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Candidate,
    Client,
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "candidate" => Ok(UserType::Candidate),
            "client" => Ok(UserType::Client),
            other => Err(format!("Unknown user_type '{other}'")),
        }
    }
}

/// Raw row of `user_repo_preferences`.
#[derive(Debug, Clone, FromRow)]
pub struct PreferenceRow {
    pub id: i64,
    pub user_id: String,
    pub preference_type: String,
    pub preference_value: String,
    pub validated: bool,
    pub confidence: Option<f64>,
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored preference with its type parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub id: i64,
    pub user_id: String,
    pub preference_type: PreferenceType,
    pub preference_value: String,
    pub validated: bool,
    pub confidence: Option<f64>,
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PreferenceRow> for Preference {
    type Error = String;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(Preference {
            id: row.id,
            user_id: row.user_id,
            preference_type: row.preference_type.parse()?,
            preference_value: row.preference_value,
            validated: row.validated,
            confidence: row.confidence,
            raw_text: row.raw_text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
