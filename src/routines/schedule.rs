//! Recurrence rules and date matching.
//!
//! A [`Schedule`] is one of three recurrence kinds, each carrying only the
//! field meaningful for it. [`ScheduleRecord`] is the loose wire and storage
//! shape (`scheduleType` + `scheduleConfig` with three optional fields); it is
//! converted into a `Schedule` at the boundary, and a record whose populated
//! field does not fit its type never matches any date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{RoutineError, RoutineResult};

/// Recurrence rule for a routine definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord", into = "ScheduleRecord")]
pub enum Schedule {
    /// Days of week, Sunday = 0
    Weekly { days_of_week: BTreeSet<u8> },
    /// Days of month, 1-31
    Monthly { days_of_month: BTreeSet<u8> },
    /// Calendar dates formatted "MM-DD"
    Yearly { dates_of_year: BTreeSet<String> },
}

impl Schedule {
    /// Weekly rule on the given day indices.
    pub fn weekly(days: impl IntoIterator<Item = u8>) -> Self {
        Schedule::Weekly {
            days_of_week: days.into_iter().collect(),
        }
    }

    /// Monthly rule on the given days of month.
    pub fn monthly(days: impl IntoIterator<Item = u8>) -> Self {
        Schedule::Monthly {
            days_of_month: days.into_iter().collect(),
        }
    }

    /// Yearly rule on the given "MM-DD" dates.
    pub fn yearly<S: Into<String>>(dates: impl IntoIterator<Item = S>) -> Self {
        Schedule::Yearly {
            dates_of_year: dates.into_iter().map(Into::into).collect(),
        }
    }

    /// Storage name of the rule kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Schedule::Weekly { .. } => "weekly",
            Schedule::Monthly { .. } => "monthly",
            Schedule::Yearly { .. } => "yearly",
        }
    }

    /// Whether the rule applies on a local calendar date.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Schedule::Weekly { days_of_week } => {
                days_of_week.contains(&(date.weekday().num_days_from_sunday() as u8))
            }
            Schedule::Monthly { days_of_month } => days_of_month.contains(&(date.day() as u8)),
            Schedule::Yearly { dates_of_year } => {
                dates_of_year.contains(&date.format("%m-%d").to_string())
            }
        }
    }

    /// Whether the rule is decided by day of week alone.
    pub fn is_weekly(&self) -> bool {
        matches!(self, Schedule::Weekly { .. })
    }

    /// Check every entry is in range and the rule is not empty.
    pub fn validate(&self) -> RoutineResult<()> {
        match self {
            Schedule::Weekly { days_of_week } => {
                if days_of_week.is_empty() {
                    return Err(RoutineError::validation("daysOfWeek must not be empty"));
                }
                if let Some(day) = days_of_week.iter().find(|d| **d > 6) {
                    return Err(RoutineError::validation(format!(
                        "daysOfWeek entry {day} is out of range 0-6"
                    )));
                }
            }
            Schedule::Monthly { days_of_month } => {
                if days_of_month.is_empty() {
                    return Err(RoutineError::validation("daysOfMonth must not be empty"));
                }
                if let Some(day) = days_of_month.iter().find(|d| !(1..=31).contains(*d)) {
                    return Err(RoutineError::validation(format!(
                        "daysOfMonth entry {day} is out of range 1-31"
                    )));
                }
            }
            Schedule::Yearly { dates_of_year } => {
                if dates_of_year.is_empty() {
                    return Err(RoutineError::validation("datesOfYear must not be empty"));
                }
                for date in dates_of_year {
                    parse_month_day(date)?;
                }
            }
        }
        Ok(())
    }

    /// Stable identity of the rule, used to recognise the same commitment
    /// across upserts.
    pub fn canonical_key(&self) -> String {
        match self {
            Schedule::Weekly { days_of_week } => format!("weekly:{}", join(days_of_week)),
            Schedule::Monthly { days_of_month } => format!("monthly:{}", join(days_of_month)),
            Schedule::Yearly { dates_of_year } => format!("yearly:{}", join(dates_of_year)),
        }
    }

    /// Storage shape of this rule.
    pub fn to_record(&self) -> ScheduleRecord {
        self.clone().into()
    }
}

fn join<T: ToString>(values: &BTreeSet<T>) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Parse "MM-DD", accepting 02-29.
fn parse_month_day(value: &str) -> RoutineResult<(u32, u32)> {
    let invalid = || RoutineError::validation(format!("datesOfYear entry '{value}' is not a valid MM-DD date"));

    let (month, day) = value.split_once('-').ok_or_else(invalid)?;
    if month.len() != 2 || day.len() != 2 {
        return Err(invalid());
    }
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    // 2000 is a leap year, so Feb 29 validates.
    NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(invalid)?;
    Ok((month, day))
}

/// Loose recurrence configuration as stored and sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_month: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates_of_year: Option<Vec<String>>,
}

/// Schedule type plus configuration, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub schedule_type: String,
    #[serde(default)]
    pub schedule_config: ScheduleConfig,
}

impl TryFrom<ScheduleRecord> for Schedule {
    type Error = RoutineError;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        let config = record.schedule_config;
        let schedule = match record.schedule_type.trim().to_lowercase().as_str() {
            "weekly" => match config.days_of_week {
                Some(days) if config.days_of_month.is_none() && config.dates_of_year.is_none() => {
                    Schedule::weekly(days)
                }
                _ => return Err(mismatch("weekly", "daysOfWeek")),
            },
            "monthly" => match config.days_of_month {
                Some(days) if config.days_of_week.is_none() && config.dates_of_year.is_none() => {
                    Schedule::monthly(days)
                }
                _ => return Err(mismatch("monthly", "daysOfMonth")),
            },
            "yearly" => match config.dates_of_year {
                Some(dates) if config.days_of_week.is_none() && config.days_of_month.is_none() => {
                    Schedule::yearly(dates)
                }
                _ => return Err(mismatch("yearly", "datesOfYear")),
            },
            other => {
                return Err(RoutineError::validation(format!("unknown schedule type: {other}")));
            }
        };

        schedule.validate()?;
        Ok(schedule)
    }
}

fn mismatch(kind: &str, field: &str) -> RoutineError {
    RoutineError::validation(format!(
        "{kind} schedule requires scheduleConfig.{field} and no other field"
    ))
}

impl From<Schedule> for ScheduleRecord {
    fn from(schedule: Schedule) -> Self {
        let schedule_type = schedule.kind().to_string();
        let schedule_config = match schedule {
            Schedule::Weekly { days_of_week } => ScheduleConfig {
                days_of_week: Some(days_of_week.into_iter().collect()),
                ..Default::default()
            },
            Schedule::Monthly { days_of_month } => ScheduleConfig {
                days_of_month: Some(days_of_month.into_iter().collect()),
                ..Default::default()
            },
            Schedule::Yearly { dates_of_year } => ScheduleConfig {
                dates_of_year: Some(dates_of_year.into_iter().collect()),
                ..Default::default()
            },
        };

        Self {
            schedule_type,
            schedule_config,
        }
    }
}

/// Decide whether a loose rule applies on a date.
///
/// A rule whose configuration does not fit its type never matches.
pub fn matches(rule: &ScheduleRecord, date: NaiveDate) -> bool {
    Schedule::try_from(rule.clone())
        .map(|schedule| schedule.matches(date))
        .unwrap_or(false)
}
