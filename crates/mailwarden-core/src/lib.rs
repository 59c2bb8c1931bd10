//! # mailwarden-core
//!
//! Core logic for `MailWarden`, a scheduled mailbox search tool.
//!
//! This crate provides:
//! - Search criteria compilation with approximate subject matching
//! - A mailbox search client running per-profile batch searches
//! - Search profiles with persisted execution statistics
//! - A schedule engine (daily, weekly, fixed interval)
//! - Orchestration of the search, report, and delivery pipeline

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod criteria;
mod error;
pub mod orchestrator;
pub mod profile;
pub mod report;
pub mod schedule;
pub mod search;
pub mod status;

pub use config::{CredentialStore, DeliveryConfig, DeliveryConfigStore, MailCredentials};
pub use criteria::{compile, FilterExpr};
pub use error::{Error, Result};
pub use orchestrator::{
    RunError, RunOutcome, RunSummary, SearchOrchestrator, DEFAULT_DAYS_BACK,
};
pub use profile::{
    AggregatedStats, ProfileId, ProfileRepository, ProfileStats, ProfileSummary,
    ProfileUpdate, ProfileWithStats, SearchProfile,
};
pub use report::{
    CsvReportGenerator, ReportDispatcher, ReportError, ReportGenerator, SendError,
};
pub use schedule::{
    ScheduleConfig, ScheduleDay, ScheduleEngine, ScheduleKind, ScheduledJob,
    SchedulerStatus, StartError,
};
pub use search::{
    ConnectError, MailConnector, MailSearchClient, MailSession, MessageSummary,
    ProfileSearchResult, RawMessage, SessionError,
};
pub use status::{StatusEvent, StatusLevel, StatusSender};
