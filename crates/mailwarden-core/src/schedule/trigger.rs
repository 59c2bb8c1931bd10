//! Trigger instants derived from a schedule configuration.
//!
//! All of the calendar math lives here as pure functions over naive local
//! datetimes so the engine loop stays trivial and the math is testable
//! without a running clock.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

use super::config::{
    parse_time, IntervalUnit, ScheduleConfig, ScheduleConfigError, ScheduleKind,
};

/// One recurring trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Fires at a time of day, daily or on one weekday.
    AtTime {
        /// Time of day.
        time: NaiveTime,
        /// Restrict to this weekday; `None` means every day.
        day: Option<Weekday>,
    },
    /// Fires on a fixed period, rescheduled from each fire instant. Missed
    /// periods are not backfilled.
    Every(Duration),
}

impl TriggerSpec {
    /// The first instant strictly after `after` at which this trigger fires.
    #[must_use]
    pub fn next_fire(&self, after: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::AtTime { time, day } => next_at_time(after, *time, *day),
            Self::Every(period) => after + *period,
        }
    }
}

fn next_at_time(
    after: NaiveDateTime,
    time: NaiveTime,
    day: Option<Weekday>,
) -> NaiveDateTime {
    for offset in 0..=7 {
        let date = after.date() + Duration::days(offset);
        if let Some(weekday) = day {
            if date.weekday() != weekday {
                continue;
            }
        }
        let candidate = date.and_time(time);
        if candidate > after {
            return candidate;
        }
    }
    // A matching day always exists within the scanned window; keep a sane
    // fallback anyway.
    after + Duration::weeks(1)
}

/// Translate a configuration into its concrete triggers.
///
/// # Errors
///
/// Returns the same errors as [`ScheduleConfig::validate`]; callers that
/// validated first will not see them.
pub fn build_triggers(
    config: &ScheduleConfig,
) -> Result<Vec<TriggerSpec>, ScheduleConfigError> {
    match &config.kind {
        ScheduleKind::Daily { time } => Ok(vec![TriggerSpec::AtTime {
            time: parse_time(time)?,
            day: None,
        }]),
        ScheduleKind::Weekly { time, days } => {
            if days.is_empty() {
                return Err(ScheduleConfigError::NoDaysSelected);
            }
            let time = parse_time(time)?;
            Ok(days
                .iter()
                .map(|d| TriggerSpec::AtTime {
                    time,
                    day: Some(d.to_weekday()),
                })
                .collect())
        }
        ScheduleKind::Interval { amount, unit } => {
            if *amount == 0 {
                return Err(ScheduleConfigError::ZeroInterval);
            }
            let period = match unit {
                IntervalUnit::Minutes => Duration::minutes(i64::from(*amount)),
                IntervalUnit::Hours => Duration::hours(i64::from(*amount)),
            };
            Ok(vec![TriggerSpec::Every(period)])
        }
    }
}
