//! Onboarding gate.
//!
//! A new user finishes onboarding once their weekly routine is complete:
//! every day has at least one morning item and one night item. The sleep
//! routine step is offered afterwards and may be skipped.

pub mod steps;

use serde::{Deserialize, Serialize};

use crate::routines::completion::{RequiredFields, WeeklyProgress};
use crate::routines::sleep::SleepRoutine;

pub use steps::OnboardingStep;

/// Onboarding state derived from the user's stored routines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    /// First step still open, or `Complete`
    pub current_step: OnboardingStep,
    /// Steps that are done
    pub completed_steps: Vec<OnboardingStep>,
    /// The gate: the weekly routine is complete
    pub is_complete: bool,
    pub sleep_complete: bool,
    /// Missing weekly requirements followed by missing sleep requirements
    pub missing_requirements: Vec<String>,
}

impl OnboardingStatus {
    /// Evaluate the steps against weekly progress and an optional sleep routine.
    pub fn evaluate(weekly: &WeeklyProgress, sleep: Option<&SleepRoutine>) -> Self {
        let sleep_complete = sleep.is_some_and(|s| s.is_satisfied());

        let mut completed_steps = vec![OnboardingStep::Welcome];
        if weekly.is_complete {
            completed_steps.push(OnboardingStep::WeeklyRoutine);
        }
        if sleep_complete {
            completed_steps.push(OnboardingStep::SleepRoutine);
        }
        if weekly.is_complete {
            completed_steps.push(OnboardingStep::Complete);
        }

        let current_step = OnboardingStep::all()
            .iter()
            .copied()
            .find(|step| !completed_steps.contains(step))
            .unwrap_or(OnboardingStep::Complete);

        let mut missing_requirements = weekly.missing_requirements.clone();
        match sleep {
            Some(routine) => missing_requirements.extend(routine.missing()),
            None => missing_requirements.extend(SleepRoutine::default().missing()),
        }

        Self {
            current_step,
            completed_steps,
            is_complete: weekly.is_complete,
            sleep_complete,
            missing_requirements,
        }
    }

    pub fn is_step_complete(&self, step: OnboardingStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Progress as a percentage (0-100).
    pub fn progress_percent(&self) -> u8 {
        let total = OnboardingStep::all().len();
        ((self.completed_steps.len() * 100) / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::completion::weekly_progress;
    use crate::routines::grid::ReferenceWeek;
    use crate::routines::schedule::Schedule;
    use crate::routines::types::{RoutineDefinition, RoutineItem, TimeOfDay};
    use chrono::{NaiveDate, NaiveTime};

    fn week() -> ReferenceWeek {
        ReferenceWeek::containing(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap())
    }

    fn full_week() -> WeeklyProgress {
        let definitions = [TimeOfDay::Morning, TimeOfDay::Night].map(|time| {
            RoutineDefinition::new("u1", Schedule::weekly(0..7), Some(time))
                .with_item(RoutineItem::new("Stretch", "mobility"))
        });
        weekly_progress(&definitions, &week())
    }

    fn full_sleep() -> SleepRoutine {
        SleepRoutine::new(
            NaiveTime::from_hms_opt(22, 0, 0),
            NaiveTime::from_hms_opt(6, 0, 0),
        )
        .with_pre_bed_item("Tea")
    }

    #[test]
    fn test_new_user_is_on_weekly_step() {
        let status = OnboardingStatus::evaluate(&weekly_progress(&[], &week()), None);

        assert!(!status.is_complete);
        assert_eq!(status.current_step, OnboardingStep::WeeklyRoutine);
        assert_eq!(status.completed_steps, vec![OnboardingStep::Welcome]);
        assert_eq!(status.missing_requirements.len(), 14 + 3);
        assert_eq!(status.progress_percent(), 25);
    }

    #[test]
    fn test_weekly_routine_opens_the_gate_without_sleep() {
        let status = OnboardingStatus::evaluate(&full_week(), None);

        assert!(status.is_complete);
        assert!(!status.sleep_complete);
        assert_eq!(status.current_step, OnboardingStep::SleepRoutine);
        assert!(status.is_step_complete(OnboardingStep::Complete));
        assert_eq!(
            status.missing_requirements,
            vec!["bedtime", "wake time", "pre-bed item"]
        );
    }

    #[test]
    fn test_sleep_alone_does_not_open_the_gate() {
        let sleep = full_sleep();
        let status = OnboardingStatus::evaluate(&weekly_progress(&[], &week()), Some(&sleep));

        assert!(!status.is_complete);
        assert!(status.sleep_complete);
        assert_eq!(status.current_step, OnboardingStep::WeeklyRoutine);
    }

    #[test]
    fn test_everything_done() {
        let sleep = full_sleep();
        let status = OnboardingStatus::evaluate(&full_week(), Some(&sleep));

        assert_eq!(status.current_step, OnboardingStep::Complete);
        assert!(status.missing_requirements.is_empty());
        assert_eq!(status.progress_percent(), 100);
    }
}
