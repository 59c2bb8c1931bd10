//! Schedule configuration persistence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

use super::config::ScheduleConfig;

/// Flat-file store for the single current schedule configuration.
pub struct ScheduleConfigStore {
    file: PathBuf,
}

impl ScheduleConfigStore {
    /// Create a store rooted at the given config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        Ok(Self {
            file: config_dir.join("scheduler_config.json"),
        })
    }

    /// Load the current configuration, if one has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<ScheduleConfig>> {
        if !self.file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Replace the current configuration wholesale.
    ///
    /// Validation happens in the engine before this is called; the store
    /// persists whatever it is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, config: &ScheduleConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.file, json)?;
        debug!(path = %self.file.display(), "saved schedule configuration");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schedule::config::{IntervalUnit, ScheduleKind};
    use tempfile::TempDir;

    #[test]
    fn load_without_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ScheduleConfigStore::new(dir.path()).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ScheduleConfigStore::new(dir.path()).unwrap();

        let config = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Interval {
                amount: 15,
                unit: IntervalUnit::Minutes,
            },
        };
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), Some(config));
    }
}
