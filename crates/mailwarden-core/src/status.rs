//! Progress reporting.
//!
//! Long-running operations emit status events over an unbounded channel so
//! a UI or log consumer can follow along. Emission never blocks and never
//! fails; a missing or dropped consumer just means events go nowhere.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::debug;

/// Severity of a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    /// Routine progress.
    Info,
    /// A step completed as intended.
    Success,
    /// Something benign went sideways.
    Warning,
    /// A step failed.
    Error,
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    /// Human-readable message.
    pub message: String,
    /// Severity.
    pub level: StatusLevel,
    /// When the event was emitted.
    pub at: DateTime<Utc>,
}

/// Handle for emitting status events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSender {
    /// Create a sender paired with a receiver for the consumer side.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sender that silently discards everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event. Never blocks, never panics; events sent after the
    /// receiver is gone are dropped.
    pub fn emit(&self, level: StatusLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "status");
        if let Some(tx) = &self.tx {
            let _ = tx.send(StatusEvent {
                message,
                level,
                at: Utc::now(),
            });
        }
    }
}
