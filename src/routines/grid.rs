//! Weekly slot grid.
//!
//! Places the items of active routine definitions into a 7 x 4 grid of
//! (day of week, time of day) cells for one calendar week.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::types::{DayOfWeek, RoutineDefinition, RoutineItem, TimeOfDay};

/// The Sunday-to-Saturday week a grid is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceWeek {
    start: NaiveDate,
}

impl ReferenceWeek {
    /// Week containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_sunday() as i64;
        Self {
            start: date - Duration::days(offset),
        }
    }

    /// Week containing today's local date.
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// The Sunday that starts the week.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Concrete date of a weekday within the week.
    pub fn date_for(&self, day: DayOfWeek) -> NaiveDate {
        self.start + Duration::days(day.index() as i64)
    }
}

/// One (day, time of day) cell of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotCell {
    pub day: DayOfWeek,
    pub time_of_day: TimeOfDay,
    /// Number of active definitions that apply to this cell
    pub matched_definitions: usize,
    /// Items of all matching definitions, each definition in its own order
    pub items: Vec<RoutineItem>,
}

impl SlotCell {
    fn new(day: DayOfWeek, time_of_day: TimeOfDay) -> Self {
        Self {
            day,
            time_of_day,
            matched_definitions: 0,
            items: Vec::new(),
        }
    }
}

/// Effective item set for every cell of one week.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotGrid {
    week: ReferenceWeek,
    cells: [[SlotCell; 4]; 7],
}

impl SlotGrid {
    /// Week the grid was built for.
    pub fn week(&self) -> ReferenceWeek {
        self.week
    }

    /// Cell for a day and slot.
    pub fn cell(&self, day: DayOfWeek, time_of_day: TimeOfDay) -> &SlotCell {
        &self.cells[day.index() as usize][time_of_day.index()]
    }

    /// The four cells of a day, in slot order.
    pub fn day(&self, day: DayOfWeek) -> &[SlotCell; 4] {
        &self.cells[day.index() as usize]
    }

    /// All cells, day then slot.
    pub fn cells(&self) -> impl Iterator<Item = &SlotCell> {
        self.cells.iter().flat_map(|row| row.iter())
    }
}

/// Build the slot grid for a set of definitions.
///
/// Only active definitions with a time of day take part. Weekly rules are
/// decided by the weekday; monthly and yearly rules by the concrete date of
/// that weekday in `week`.
pub fn build_grid(definitions: &[RoutineDefinition], week: &ReferenceWeek) -> SlotGrid {
    let mut cells: [[SlotCell; 4]; 7] = std::array::from_fn(|d| {
        std::array::from_fn(|t| SlotCell::new(DayOfWeek::ALL[d], TimeOfDay::ALL[t]))
    });

    for definition in definitions.iter().filter(|d| d.is_active()) {
        let Some(time_of_day) = definition.time_of_day else {
            continue;
        };
        let items = definition.ordered_items();

        for day in DayOfWeek::ALL {
            if !definition.schedule.matches(week.date_for(day)) {
                continue;
            }
            let cell = &mut cells[day.index() as usize][time_of_day.index()];
            cell.matched_definitions += 1;
            cell.items.extend(items.iter().cloned());
        }
    }

    SlotGrid { week: *week, cells }
}
