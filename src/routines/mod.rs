//! Routine definitions and weekly completion.
//!
//! Covers:
//! - Recurrence rules (weekly, monthly, yearly) and date matching
//! - The 7-day x 4-slot grid built from active definitions
//! - Slot classification and the weekly completion gate
//! - The sleep routine variant of the same required-field pattern

pub mod completion;
pub mod grid;
pub mod schedule;
pub mod sleep;
pub mod types;

// Re-exports for convenience
pub use completion::{
    classify, weekly_progress, DaySlotStatus, Requirement, RequiredFields, SlotProgress, SlotStatus,
    WeeklyProgress,
};
pub use grid::{build_grid, ReferenceWeek, SlotCell, SlotGrid};
pub use schedule::{matches, Schedule, ScheduleConfig, ScheduleRecord};
pub use sleep::{SleepProgress, SleepRoutine};
pub use types::{
    Classification, DayOfWeek, DefinitionStatus, RoutineDefinition, RoutineItem, TimeOfDay,
};
