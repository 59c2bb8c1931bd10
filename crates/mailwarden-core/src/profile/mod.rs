//! Search profile management.
//!
//! Profiles are named search configurations with per-profile execution
//! statistics, persisted as flat JSON files.

mod model;
mod repository;
mod validation;

pub use model::{
    AggregatedStats, ExecutionRecord, ProfileId, ProfileStats, ProfileSummary,
    ProfileWithStats, SearchProfile, HISTORY_LIMIT,
};
pub use repository::{ProfileRepository, ProfileUpdate};
pub use validation::{validate_criteria, validate_name, ProfileValidationError};
