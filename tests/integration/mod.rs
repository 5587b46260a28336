//! Integration test modules.

mod activation_test;
mod definitions_test;
mod onboarding_test;
mod weekly_progress_test;
