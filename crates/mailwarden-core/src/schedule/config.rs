//! Declarative schedule configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Weekday selector, persisted as lowercase day names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleDay {
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
    /// Sunday.
    Sunday,
}

impl ScheduleDay {
    /// Corresponding chrono weekday.
    #[must_use]
    pub const fn to_weekday(self) -> chrono::Weekday {
        match self {
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
            Self::Sunday => chrono::Weekday::Sun,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }
}

/// Unit for interval schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    /// Fire every N minutes.
    Minutes,
    /// Fire every N hours.
    Hours,
}

impl IntervalUnit {
    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minutes => "minutes",
            Self::Hours => "hours",
        }
    }
}

/// The schedule variant, tagged by `type` in the persisted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScheduleKind {
    /// Once a day at a fixed time.
    Daily {
        /// Time of day, `HH:MM`.
        time: String,
    },
    /// At a fixed time on selected weekdays.
    Weekly {
        /// Time of day, `HH:MM`.
        time: String,
        /// Selected weekdays; non-empty when the schedule is enabled.
        days: Vec<ScheduleDay>,
    },
    /// Every N minutes or hours.
    Interval {
        /// Positive interval amount.
        amount: u32,
        /// Interval unit.
        unit: IntervalUnit,
    },
}

/// The single current schedule configuration, replaced wholesale on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Whether scheduled execution is enabled.
    pub enabled: bool,
    /// The schedule variant.
    #[serde(flatten)]
    pub kind: ScheduleKind,
}

/// Validation error for a schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleConfigError {
    /// Time is not a valid `HH:MM` value.
    #[error("Invalid time of day: {0} (expected HH:MM)")]
    InvalidTime(String),
    /// Weekly schedule enabled with no weekday selected.
    #[error("Weekly schedule requires at least one weekday")]
    NoDaysSelected,
    /// Interval amount is zero.
    #[error("Interval amount must be positive")]
    ZeroInterval,
}

impl ScheduleConfig {
    /// Validate the configuration.
    ///
    /// A disabled configuration is accepted as-is; the variant's required
    /// fields are only enforced when `enabled` is true.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ScheduleConfigError> {
        if !self.enabled {
            return Ok(());
        }
        match &self.kind {
            ScheduleKind::Daily { time } => {
                parse_time(time)?;
            }
            ScheduleKind::Weekly { time, days } => {
                parse_time(time)?;
                if days.is_empty() {
                    return Err(ScheduleConfigError::NoDaysSelected);
                }
            }
            ScheduleKind::Interval { amount, .. } => {
                if *amount == 0 {
                    return Err(ScheduleConfigError::ZeroInterval);
                }
            }
        }
        Ok(())
    }

    /// Human-readable description of the schedule.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.kind {
            ScheduleKind::Daily { time } => format!("Daily at {time}"),
            ScheduleKind::Weekly { time, days } => {
                if days.is_empty() {
                    format!("Weekly at {time} (no days selected)")
                } else {
                    let names: Vec<&str> =
                        days.iter().map(|d| d.label()).collect();
                    format!("{} at {time}", names.join(", "))
                }
            }
            ScheduleKind::Interval { amount, unit } => {
                format!("Every {amount} {}", unit.label())
            }
        }
    }

    /// Short tag for the schedule variant.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.kind {
            ScheduleKind::Daily { .. } => "daily",
            ScheduleKind::Weekly { .. } => "weekly",
            ScheduleKind::Interval { .. } => "interval",
        }
    }
}

/// Parse an `HH:MM` time of day.
///
/// # Errors
///
/// Returns `InvalidTime` when the value does not parse.
pub fn parse_time(time: &str) -> Result<NaiveTime, ScheduleConfigError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| ScheduleConfigError::InvalidTime(time.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn weekly_without_days_rejected_only_when_enabled() {
        let kind = ScheduleKind::Weekly {
            time: "09:00".to_string(),
            days: Vec::new(),
        };
        let enabled = ScheduleConfig {
            enabled: true,
            kind: kind.clone(),
        };
        assert_eq!(
            enabled.validate(),
            Err(ScheduleConfigError::NoDaysSelected)
        );

        let disabled = ScheduleConfig {
            enabled: false,
            kind,
        };
        assert_eq!(disabled.validate(), Ok(()));
    }

    #[test]
    fn invalid_time_rejected() {
        let config = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Daily {
                time: "25:99".to_string(),
            },
        };
        assert!(matches!(
            config.validate(),
            Err(ScheduleConfigError::InvalidTime(_))
        ));
    }

    #[test]
    fn zero_interval_rejected() {
        let config = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Interval {
                amount: 0,
                unit: IntervalUnit::Minutes,
            },
        };
        assert_eq!(config.validate(), Err(ScheduleConfigError::ZeroInterval));
    }

    #[test]
    fn valid_configs_pass() {
        let daily = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Daily {
                time: "09:00".to_string(),
            },
        };
        assert_eq!(daily.validate(), Ok(()));

        let weekly = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Weekly {
                time: "18:30".to_string(),
                days: vec![ScheduleDay::Monday, ScheduleDay::Friday],
            },
        };
        assert_eq!(weekly.validate(), Ok(()));
    }

    #[test]
    fn json_contract_round_trips() {
        let config = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Weekly {
                time: "09:00".to_string(),
                days: vec![ScheduleDay::Monday, ScheduleDay::Sunday],
            },
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["type"], "weekly");
        assert_eq!(json["enabled"], true);
        assert_eq!(json["days"][0], "monday");

        let back: ScheduleConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn interval_json_uses_lowercase_unit() {
        let config = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Interval {
                amount: 30,
                unit: IntervalUnit::Minutes,
            },
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["type"], "interval");
        assert_eq!(json["unit"], "minutes");
        assert_eq!(json["amount"], 30);
    }

    #[test]
    fn descriptions() {
        let daily = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Daily {
                time: "09:00".to_string(),
            },
        };
        assert_eq!(daily.description(), "Daily at 09:00");

        let weekly = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Weekly {
                time: "09:00".to_string(),
                days: vec![ScheduleDay::Monday, ScheduleDay::Friday],
            },
        };
        assert_eq!(weekly.description(), "Monday, Friday at 09:00");

        let interval = ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Interval {
                amount: 2,
                unit: IntervalUnit::Hours,
            },
        };
        assert_eq!(interval.description(), "Every 2 hours");
    }
}
