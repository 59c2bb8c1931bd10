//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Profile not found.
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile name or criteria failed validation.
    #[error("Profile validation error: {0}")]
    ProfileValidation(#[from] crate::profile::ProfileValidationError),

    /// Schedule configuration failed validation.
    #[error("Schedule configuration error: {0}")]
    ScheduleConfig(#[from] crate::schedule::ScheduleConfigError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
