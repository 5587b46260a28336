//! Onboarding steps.

use serde::{Deserialize, Serialize};

/// Steps a new user goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OnboardingStep {
    /// Welcome screen with overview
    #[default]
    Welcome,
    /// Morning and night routines for all seven days
    WeeklyRoutine,
    /// Bedtime, wake time and wind-down list
    SleepRoutine,
    /// Completion screen
    Complete,
}

impl OnboardingStep {
    /// Get all steps in order.
    pub fn all() -> &'static [OnboardingStep] {
        &[
            OnboardingStep::Welcome,
            OnboardingStep::WeeklyRoutine,
            OnboardingStep::SleepRoutine,
            OnboardingStep::Complete,
        ]
    }

    /// Get the step index (0-based).
    pub fn index(&self) -> usize {
        Self::all().iter().position(|s| s == self).unwrap_or(0)
    }

    /// Get the next step, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        Self::all().get(self.index() + 1).copied()
    }

    /// Get the previous step, if any.
    pub fn previous(&self) -> Option<OnboardingStep> {
        self.index().checked_sub(1).map(|idx| Self::all()[idx])
    }

    pub fn title(&self) -> &'static str {
        match self {
            OnboardingStep::Welcome => "Welcome",
            OnboardingStep::WeeklyRoutine => "Your Week",
            OnboardingStep::SleepRoutine => "Your Sleep",
            OnboardingStep::Complete => "All Set!",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OnboardingStep::Welcome => "Let's build the routines that shape your week.",
            OnboardingStep::WeeklyRoutine => {
                "Add something to every morning and every night, Sunday through Saturday."
            }
            OnboardingStep::SleepRoutine => {
                "Pick a bedtime, a wake time and at least one thing you do before bed."
            }
            OnboardingStep::Complete => "Your routine is ready.",
        }
    }

    /// Check if this step can be skipped.
    pub fn is_skippable(&self) -> bool {
        match self {
            OnboardingStep::Welcome => true,
            OnboardingStep::WeeklyRoutine => false, // The gate
            OnboardingStep::SleepRoutine => true,
            OnboardingStep::Complete => false,
        }
    }

    pub fn is_first(&self) -> bool {
        *self == OnboardingStep::Welcome
    }

    pub fn is_last(&self) -> bool {
        *self == OnboardingStep::Complete
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_navigation() {
        assert_eq!(OnboardingStep::Welcome.next(), Some(OnboardingStep::WeeklyRoutine));
        assert_eq!(OnboardingStep::Complete.next(), None);
        assert_eq!(OnboardingStep::Welcome.previous(), None);
        assert_eq!(
            OnboardingStep::Complete.previous(),
            Some(OnboardingStep::SleepRoutine)
        );
        assert!(OnboardingStep::default().is_first());
        assert!(OnboardingStep::Complete.is_last());
    }

    #[test]
    fn test_weekly_step_cannot_be_skipped() {
        assert!(!OnboardingStep::WeeklyRoutine.is_skippable());
        assert!(OnboardingStep::SleepRoutine.is_skippable());
    }
}
