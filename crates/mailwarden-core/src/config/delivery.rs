//! Report delivery configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Where and whether generated reports are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Whether report delivery is switched on.
    pub enabled: bool,
    /// Primary recipient address.
    pub recipient: String,
    /// Additional recipients.
    #[serde(default)]
    pub cc: Vec<String>,
    /// Subject line for the delivery message.
    #[serde(default)]
    pub subject: String,
}

impl DeliveryConfig {
    /// Whether delivery should actually be attempted.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.enabled && !self.recipient.trim().is_empty()
    }
}

/// Flat-file store for the delivery configuration.
pub struct DeliveryConfigStore {
    file: PathBuf,
}

impl DeliveryConfigStore {
    /// Create a store rooted at the given config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        Ok(Self {
            file: config_dir.join("email_send_config.json"),
        })
    }

    /// Load the delivery configuration; a missing file means delivery is
    /// not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<DeliveryConfig> {
        if !self.file.exists() {
            return Ok(DeliveryConfig::default());
        }
        let content = fs::read_to_string(&self.file)?;
        if content.trim().is_empty() {
            return Ok(DeliveryConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the delivery configuration wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, config: &DeliveryConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.file, json)?;
        debug!(path = %self.file.display(), "saved delivery configuration");
        Ok(())
    }
}
