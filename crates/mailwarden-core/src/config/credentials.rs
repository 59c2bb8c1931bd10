//! Account credential storage.
//!
//! Credentials live in a flat JSON file with the secret base64-obfuscated.
//! That is deliberate compatibility with the existing on-disk format, not
//! protection: anyone who can read the file can recover the secret.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Account credentials plus the configured outgoing server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailCredentials {
    /// Account address.
    pub address: String,
    /// Account secret, held in clear in memory.
    pub secret: String,
    /// Outgoing (SMTP) server host; the mailbox host is derived from it.
    pub server_host: String,
    /// Outgoing server port.
    pub server_port: u16,
}

/// On-disk shape, secret obfuscated.
#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    email: String,
    password: String,
    smtp_server: String,
    smtp_port: u16,
}

/// Flat-file credential store.
pub struct CredentialStore {
    file: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at the given config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(config_dir: &Path) -> Result<Self> {
        fs::create_dir_all(config_dir)?;
        Ok(Self {
            file: config_dir.join("credentials.json"),
        })
    }

    /// Whether credentials have been saved.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.file.exists()
    }

    /// Load the saved credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// de-obfuscated.
    pub fn load(&self) -> Result<Option<MailCredentials>> {
        if !self.file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let stored: StoredCredentials = serde_json::from_str(&content)?;
        let secret = deobfuscate(&stored.password)?;
        Ok(Some(MailCredentials {
            address: stored.email,
            secret,
            server_host: stored.smtp_server,
            server_port: stored.smtp_port,
        }))
    }

    /// Save credentials, replacing any existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, credentials: &MailCredentials) -> Result<()> {
        let stored = StoredCredentials {
            email: credentials.address.clone(),
            password: obfuscate(&credentials.secret),
            smtp_server: credentials.server_host.clone(),
            smtp_port: credentials.server_port,
        };
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.file, json)?;
        debug!(path = %self.file.display(), "saved credentials");
        Ok(())
    }

    /// Remove the saved credentials. A no-op when none exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn delete(&self) -> Result<()> {
        if self.file.exists() {
            fs::remove_file(&self.file)?;
            warn!("credentials deleted");
        }
        Ok(())
    }
}

fn obfuscate(secret: &str) -> String {
    STANDARD.encode(secret.as_bytes())
}

fn deobfuscate(stored: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(stored)
        .map_err(|e| Error::Config(format!("stored secret is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Config(format!("stored secret is not valid UTF-8: {e}")))
}
