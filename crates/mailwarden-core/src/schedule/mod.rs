//! Scheduled execution.
//!
//! A declarative configuration (daily, weekly, or fixed interval) is
//! persisted as a flat JSON file and translated into concrete triggers; the
//! engine polls them once a second and fires the configured job.

mod config;
mod engine;
mod store;
mod trigger;

pub use config::{
    parse_time, IntervalUnit, ScheduleConfig, ScheduleConfigError, ScheduleDay,
    ScheduleKind,
};
pub use engine::{
    Clock, ScheduleEngine, ScheduledJob, SchedulerStatus, StartError, SystemClock,
};
pub use store::ScheduleConfigStore;
pub use trigger::{build_triggers, TriggerSpec};
