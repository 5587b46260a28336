//! Slot classification and weekly completion.
//!
//! Each grid cell is `complete`, `empty` or `missing`. A day is complete when
//! its morning and night cells are complete; the week is complete when all
//! seven days are. Optional slots (midday, workout) only count towards
//! `total_slots_filled`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::grid::{build_grid, ReferenceWeek, SlotCell, SlotGrid};
use super::types::{DayOfWeek, RoutineDefinition, RoutineItem, TimeOfDay};

/// A single named condition that must hold for something to be complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Human-readable description
    pub label: String,
    pub satisfied: bool,
}

impl Requirement {
    pub fn new(label: impl Into<String>, satisfied: bool) -> Self {
        Self {
            label: label.into(),
            satisfied,
        }
    }
}

/// Anything whose completeness is the presence of a fixed set of fields.
pub trait RequiredFields {
    /// Requirements in reporting order.
    fn requirements(&self) -> Vec<Requirement>;

    /// Whether every requirement is satisfied.
    fn is_satisfied(&self) -> bool {
        self.requirements().iter().all(|r| r.satisfied)
    }

    /// Labels of the unsatisfied requirements, in order.
    fn missing(&self) -> Vec<String> {
        self.requirements()
            .into_iter()
            .filter(|r| !r.satisfied)
            .map(|r| r.label)
            .collect()
    }
}

/// Classification of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// At least one item
    Complete,
    /// A definition applies but contributes no items
    Empty,
    /// No definition applies
    Missing,
}

/// Classify a grid cell.
pub fn classify(cell: &SlotCell) -> SlotStatus {
    if cell.matched_definitions == 0 {
        SlotStatus::Missing
    } else if cell.items.is_empty() {
        SlotStatus::Empty
    } else {
        SlotStatus::Complete
    }
}

/// Progress of one slot on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotProgress {
    pub time_of_day: TimeOfDay,
    pub status: SlotStatus,
    pub required: bool,
    pub items: Vec<RoutineItem>,
}

/// Progress of all four slots on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySlotStatus {
    pub day: DayOfWeek,
    pub date: NaiveDate,
    /// Slots in grid order: morning, midday, night, workout
    pub slots: Vec<SlotProgress>,
    pub is_complete: bool,
}

impl DaySlotStatus {
    /// Status of one slot.
    pub fn slot(&self, time_of_day: TimeOfDay) -> SlotStatus {
        self.slots
            .iter()
            .find(|s| s.time_of_day == time_of_day)
            .map(|s| s.status)
            .unwrap_or(SlotStatus::Missing)
    }
}

impl RequiredFields for DaySlotStatus {
    fn requirements(&self) -> Vec<Requirement> {
        self.slots
            .iter()
            .filter(|slot| slot.required)
            .map(|slot| {
                Requirement::new(
                    format!("{} {}", self.day, slot.time_of_day),
                    slot.status == SlotStatus::Complete,
                )
            })
            .collect()
    }
}

/// Derived weekly completion state. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyProgress {
    pub week_start: NaiveDate,
    /// Sunday through Saturday
    pub days: Vec<DaySlotStatus>,
    pub total_slots_filled: usize,
    pub is_complete: bool,
    pub missing_requirements: Vec<String>,
}

impl WeeklyProgress {
    /// Aggregate a built grid.
    pub fn from_grid(grid: &SlotGrid) -> Self {
        let week = grid.week();
        let days: Vec<DaySlotStatus> = DayOfWeek::ALL
            .iter()
            .map(|&day| {
                let slots: Vec<SlotProgress> = grid
                    .day(day)
                    .iter()
                    .map(|cell| SlotProgress {
                        time_of_day: cell.time_of_day,
                        status: classify(cell),
                        required: cell.time_of_day.is_required(),
                        items: cell.items.clone(),
                    })
                    .collect();

                let mut status = DaySlotStatus {
                    day,
                    date: week.date_for(day),
                    slots,
                    is_complete: false,
                };
                status.is_complete = status.is_satisfied();
                status
            })
            .collect();

        let total_slots_filled = days
            .iter()
            .flat_map(|d| d.slots.iter())
            .filter(|s| s.status == SlotStatus::Complete)
            .count();

        let mut progress = Self {
            week_start: week.start(),
            days,
            total_slots_filled,
            is_complete: false,
            missing_requirements: Vec::new(),
        };
        progress.missing_requirements = progress.missing();
        progress.is_complete = progress.days.iter().all(|d| d.is_complete);
        progress
    }

    /// Progress of a day.
    pub fn day(&self, day: DayOfWeek) -> &DaySlotStatus {
        &self.days[day.index() as usize]
    }

    /// Number of complete days.
    pub fn complete_days(&self) -> usize {
        self.days.iter().filter(|d| d.is_complete).count()
    }
}

impl RequiredFields for WeeklyProgress {
    fn requirements(&self) -> Vec<Requirement> {
        self.days.iter().flat_map(|d| d.requirements()).collect()
    }
}

/// Build the grid and aggregate it in one step.
pub fn weekly_progress(definitions: &[RoutineDefinition], week: &ReferenceWeek) -> WeeklyProgress {
    let progress = WeeklyProgress::from_grid(&build_grid(definitions, week));
    tracing::debug!(
        week_start = %progress.week_start,
        filled = progress.total_slots_filled,
        complete = progress.is_complete,
        "Computed weekly progress"
    );
    progress
}
