//! Sleep routine: bedtime, wake time and an ordered wind-down list.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use super::completion::{Requirement, RequiredFields};
use crate::error::{RoutineError, RoutineResult};

/// A user's sleep routine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRoutine {
    #[serde(default)]
    pub bedtime: Option<NaiveTime>,
    #[serde(default)]
    pub wake_time: Option<NaiveTime>,
    /// Actions before bed, in order
    #[serde(default)]
    pub pre_bed_items: Vec<String>,
}

impl SleepRoutine {
    pub fn new(bedtime: Option<NaiveTime>, wake_time: Option<NaiveTime>) -> Self {
        Self {
            bedtime,
            wake_time,
            pre_bed_items: Vec::new(),
        }
    }

    pub fn with_pre_bed_item(mut self, item: impl Into<String>) -> Self {
        self.pre_bed_items.push(item.into());
        self
    }

    /// Time in bed, wrapping past midnight.
    pub fn sleep_duration(&self) -> Option<Duration> {
        let (bed, wake) = (self.bedtime?, self.wake_time?);
        let span = wake - bed;
        Some(if span <= Duration::zero() {
            span + Duration::days(1)
        } else {
            span
        })
    }

    /// Reject blank pre-bed items.
    pub fn validate(&self) -> RoutineResult<()> {
        if self.pre_bed_items.iter().any(|item| item.trim().is_empty()) {
            return Err(RoutineError::validation("pre-bed items must not be empty"));
        }
        Ok(())
    }
}

impl RequiredFields for SleepRoutine {
    fn requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::new("bedtime", self.bedtime.is_some()),
            Requirement::new("wake time", self.wake_time.is_some()),
            Requirement::new("pre-bed item", !self.pre_bed_items.is_empty()),
        ]
    }
}

/// Completion state of a sleep routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepProgress {
    pub is_complete: bool,
    pub missing_requirements: Vec<String>,
}

impl From<&SleepRoutine> for SleepProgress {
    fn from(routine: &SleepRoutine) -> Self {
        Self {
            is_complete: routine.is_satisfied(),
            missing_requirements: routine.missing(),
        }
    }
}
