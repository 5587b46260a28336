//! Routinely - Routine Lifecycle & Weekly Completion Engine
//!
//! Keeps a user's recurring routines (weekly, monthly or yearly commitments
//! placed in morning, midday, night or workout slots), projects them onto a
//! 7-day x 4-slot grid, and decides whether the week is complete. Also owns
//! the versioned draft/active/past lifecycle of the free-text routine
//! document.

pub mod documents;
pub mod error;
pub mod onboarding;
pub mod progress;
pub mod routines;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use documents::{DocumentManager, DocumentStatus, RoutineDocument};
pub use error::{RoutineError, RoutineResult};
pub use onboarding::{OnboardingStatus, OnboardingStep};
pub use progress::{ProgressSource, ProgressSubject};
pub use routines::{
    RoutineDefinition, RoutineItem, Schedule, SleepRoutine, TimeOfDay, WeeklyProgress,
};
pub use service::{ItemSelector, RoutineService};
pub use storage::config::AppConfig;
