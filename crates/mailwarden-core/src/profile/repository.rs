//! Flat-file profile and statistics repository.
//!
//! Profiles live in `profiles.json`, statistics in `profile_stats.json`, both
//! under the repository's config directory. Read-modify-write is not
//! transactionally isolated: concurrent writers race and the last writer
//! wins. The orchestrator's run guard keeps scheduled runs from overlapping;
//! anything else is on the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::model::{
    AggregatedStats, ProfileId, ProfileStats, ProfileSummary, ProfileWithStats,
    SearchProfile,
};
use super::validation::{validate_criteria, validate_name, ProfileValidationError};

/// Fields of a profile that can be changed after creation. `None` leaves the
/// field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New search criteria.
    pub criteria: Option<String>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Repository for search profiles and their execution statistics.
pub struct ProfileRepository {
    profiles_file: PathBuf,
    stats_file: PathBuf,
}

impl ProfileRepository {
    /// Create a repository rooted at the given config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        Ok(Self {
            profiles_file: config_dir.join("profiles.json"),
            stats_file: config_dir.join("profile_stats.json"),
        })
    }

    /// Create a new profile, validating name and criteria, and initialize its
    /// statistics record.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name/criteria or a duplicate name
    /// (case-insensitive), or an I/O error if persisting fails.
    pub fn create(&self, name: &str, criteria: &str) -> Result<ProfileId> {
        validate_name(name)?;
        validate_criteria(criteria)?;

        let name = name.trim().to_string();
        let criteria = criteria.trim().to_string();

        let mut profiles = self.load_all()?;
        if profiles
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&name))
        {
            return Err(ProfileValidationError::DuplicateName.into());
        }

        let id = ProfileId::generate();
        profiles.push(SearchProfile {
            id,
            name,
            criteria,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
            last_executed_at: None,
        });
        self.save_profiles(&profiles)?;

        let mut stats = self.load_stats()?;
        stats.entry(id).or_default();
        self.save_stats(&stats)?;

        debug!(profile_id = %id, "created profile");
        Ok(id)
    }

    /// Apply an update to an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` for unknown ids, validation errors for bad
    /// fields, or an I/O error if persisting fails.
    pub fn update(&self, id: ProfileId, update: ProfileUpdate) -> Result<()> {
        let mut profiles = self.load_all()?;

        if let Some(ref name) = update.name {
            validate_name(name)?;
            let name = name.trim();
            if profiles
                .iter()
                .any(|p| p.id != id && p.name.eq_ignore_ascii_case(name))
            {
                return Err(ProfileValidationError::DuplicateName.into());
            }
        }
        if let Some(ref criteria) = update.criteria {
            validate_criteria(criteria)?;
        }

        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProfileNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            profile.name = name.trim().to_string();
        }
        if let Some(criteria) = update.criteria {
            profile.criteria = criteria.trim().to_string();
        }
        if let Some(is_active) = update.is_active {
            profile.is_active = is_active;
        }
        profile.updated_at = Some(Utc::now());

        self.save_profiles(&profiles)
    }

    /// Delete a profile and its statistics record.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` for unknown ids or an I/O error if
    /// persisting fails.
    pub fn delete(&self, id: ProfileId) -> Result<()> {
        let mut profiles = self.load_all()?;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Err(Error::ProfileNotFound(id.to_string()));
        }
        self.save_profiles(&profiles)?;

        let mut stats = self.load_stats()?;
        stats.remove(&id);
        self.save_stats(&stats)
    }

    /// Look up a single profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the profiles file cannot be read.
    pub fn get(&self, id: ProfileId) -> Result<Option<SearchProfile>> {
        Ok(self.load_all()?.into_iter().find(|p| p.id == id))
    }

    /// Load all profiles. A missing or empty file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_all(&self) -> Result<Vec<SearchProfile>> {
        if !self.profiles_file.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.profiles_file)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Load only the active profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the profiles file cannot be read.
    pub fn load_active(&self) -> Result<Vec<SearchProfile>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|p| p.is_active)
            .collect())
    }

    /// Record one execution for a profile: overwrite its current count, add
    /// to the accumulated total, append a history entry (bounded to the most
    /// recent 50), and stamp the profile's `last_executed_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or written.
    pub fn record_execution(&self, id: ProfileId, emails_found: u64) -> Result<()> {
        let now = Utc::now();

        let mut profiles = self.load_all()?;
        if let Some(profile) = profiles.iter_mut().find(|p| p.id == id) {
            profile.last_executed_at = Some(now);
            self.save_profiles(&profiles)?;
        } else {
            warn!(profile_id = %id, "recording execution for unknown profile");
        }

        let mut stats = self.load_stats()?;
        stats.entry(id).or_default().record(emails_found, now);
        self.save_stats(&stats)
    }

    /// Statistics for one profile; a profile without recorded executions
    /// yields the zeroed default.
    ///
    /// # Errors
    ///
    /// Returns an error if the stats file cannot be read.
    pub fn stats_for(&self, id: ProfileId) -> Result<ProfileStats> {
        Ok(self.load_stats()?.remove(&id).unwrap_or_default())
    }

    /// Every profile paired with its statistics, for report generation.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read.
    pub fn aggregated_stats(&self) -> Result<AggregatedStats> {
        let profiles = self.load_all()?;
        let mut stats = self.load_stats()?;

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let profile_stats = stats.remove(&profile.id).unwrap_or_default();
                (
                    profile.id,
                    ProfileWithStats {
                        profile,
                        stats: profile_stats,
                    },
                )
            })
            .collect())
    }

    /// Totals across all profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read.
    pub fn summary(&self) -> Result<ProfileSummary> {
        let profiles = self.load_all()?;
        let stats = self.load_stats()?;

        let active = profiles.iter().filter(|p| p.is_active).count();
        let mut summary = ProfileSummary {
            total_profiles: profiles.len(),
            active_profiles: active,
            inactive_profiles: profiles.len() - active,
            ..ProfileSummary::default()
        };
        for stat in stats.values() {
            summary.total_executions += stat.total_executions;
            summary.current_emails_found += stat.current_emails_found;
            summary.total_emails_accumulated += stat.total_emails_accumulated;
        }
        Ok(summary)
    }

    fn save_profiles(&self, profiles: &[SearchProfile]) -> Result<()> {
        let json = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.profiles_file, json)?;
        Ok(())
    }

    fn load_stats(&self) -> Result<BTreeMap<ProfileId, ProfileStats>> {
        if !self.stats_file.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.stats_file)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save_stats(&self, stats: &BTreeMap<ProfileId, ProfileStats>) -> Result<()> {
        let json = serde_json::to_string_pretty(stats)?;
        fs::write(&self.stats_file, json)?;
        Ok(())
    }
}
