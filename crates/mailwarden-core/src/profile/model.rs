//! Search profile data models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of execution records retained per profile. Oldest entries are
/// dropped first.
pub const HISTORY_LIMIT: usize = 50;

/// Unique identifier for a search profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    /// Generate a fresh random profile ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, persisted search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Unique identifier.
    pub id: ProfileId,
    /// Display name, unique case-insensitively among profiles.
    pub name: String,
    /// Free-text subject-matching phrase.
    pub criteria: String,
    /// Whether scheduled runs include this profile.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// When a search last ran for this profile.
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// One entry in a profile's execution history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// When the execution happened.
    pub timestamp: DateTime<Utc>,
    /// Emails found by that execution.
    pub emails_found: u64,
}

/// Per-profile execution statistics.
///
/// `current_emails_found` holds the result of the most recent run and is
/// overwritten, never summed; `total_emails_accumulated` is the running sum
/// across every execution ever recorded, not just the retained history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Number of executions recorded.
    pub total_executions: u64,
    /// Emails found by the most recent execution.
    pub current_emails_found: u64,
    /// Running sum of emails found across all executions.
    pub total_emails_accumulated: u64,
    /// Timestamp of the most recent execution.
    #[serde(default)]
    pub last_execution_at: Option<DateTime<Utc>>,
    /// Most recent executions, bounded to [`HISTORY_LIMIT`] entries.
    #[serde(default)]
    pub history: Vec<ExecutionRecord>,
}

impl ProfileStats {
    /// Record one execution: overwrite the current count, add to the
    /// accumulated total, and append to the bounded history.
    pub fn record(&mut self, emails_found: u64, at: DateTime<Utc>) {
        self.total_executions += 1;
        self.current_emails_found = emails_found;
        self.total_emails_accumulated += emails_found;
        self.last_execution_at = Some(at);

        self.history.push(ExecutionRecord {
            timestamp: at,
            emails_found,
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }
}

/// A profile paired with its statistics, as consumed by report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileWithStats {
    /// The profile.
    pub profile: SearchProfile,
    /// Its statistics.
    pub stats: ProfileStats,
}

/// Aggregated statistics for every profile, keyed by profile ID.
pub type AggregatedStats = BTreeMap<ProfileId, ProfileWithStats>;

/// Totals across all profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Number of profiles.
    pub total_profiles: usize,
    /// Number of active profiles.
    pub active_profiles: usize,
    /// Number of inactive profiles.
    pub inactive_profiles: usize,
    /// Sum of execution counts.
    pub total_executions: u64,
    /// Sum of most-recent-run counts.
    pub current_emails_found: u64,
    /// Sum of accumulated counts.
    pub total_emails_accumulated: u64,
}
