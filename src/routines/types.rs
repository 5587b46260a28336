//! Routine definition type definitions.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::schedule::Schedule;
use crate::error::{RoutineError, RoutineResult};

/// Day of the week, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    /// All days in canonical week order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Index in `0..=6`, Sunday = 0.
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Day for an index in `0..=6`.
    pub fn from_index(index: u8) -> Option<DayOfWeek> {
        Self::ALL.get(index as usize).copied()
    }

    /// Day a calendar date falls on.
    pub fn of(date: NaiveDate) -> DayOfWeek {
        Self::ALL[date.weekday().num_days_from_sunday() as usize]
    }

    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DayOfWeek {
    type Err = RoutineError;

    /// Accepts full names, three-letter abbreviations or an index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Ok(index) = lower.parse::<u8>() {
            return DayOfWeek::from_index(index)
                .ok_or_else(|| RoutineError::validation(format!("day index out of range: {index}")));
        }
        DayOfWeek::ALL
            .iter()
            .find(|day| {
                let name = day.display_name().to_lowercase();
                name == lower || name[..3] == lower
            })
            .copied()
            .ok_or_else(|| RoutineError::validation(format!("unknown day of week: {s}")))
    }
}

/// Time-of-day slot a routine belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Midday,
    Night,
    Workout,
}

impl TimeOfDay {
    /// All slots in grid column order.
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Midday,
        TimeOfDay::Night,
        TimeOfDay::Workout,
    ];

    /// Column index in the slot grid.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Morning and night are required every day; midday and workout never are.
    pub fn is_required(&self) -> bool {
        matches!(self, TimeOfDay::Morning | TimeOfDay::Night)
    }

    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Midday => "midday",
            TimeOfDay::Night => "night",
            TimeOfDay::Workout => "workout",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "midday" => Ok(TimeOfDay::Midday),
            "night" => Ok(TimeOfDay::Night),
            "workout" => Ok(TimeOfDay::Workout),
            other => Err(RoutineError::validation(format!("unknown time of day: {other}"))),
        }
    }
}

/// Caller-supplied judgement of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Good,
    Bad,
    #[default]
    Neutral,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Good => "good",
            Classification::Bad => "bad",
            Classification::Neutral => "neutral",
        }
    }
}

impl FromStr for Classification {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "good" => Ok(Classification::Good),
            "bad" => Ok(Classification::Bad),
            "neutral" => Ok(Classification::Neutral),
            other => Err(RoutineError::validation(format!("unknown classification: {other}"))),
        }
    }
}

/// Lifecycle status of a routine definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionStatus {
    Pending,
    #[default]
    Active,
    Archived,
}

impl DefinitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionStatus::Pending => "pending",
            DefinitionStatus::Active => "active",
            DefinitionStatus::Archived => "archived",
        }
    }
}

impl FromStr for DefinitionStatus {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(DefinitionStatus::Pending),
            "active" => Ok(DefinitionStatus::Active),
            "archived" => Ok(DefinitionStatus::Archived),
            other => Err(RoutineError::validation(format!("unknown definition status: {other}"))),
        }
    }
}

/// One atomic action within a routine definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineItem {
    /// Specific action, e.g. "10 push-ups"
    pub name: String,
    /// Free-form category
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default)]
    pub is_optional: bool,
    /// Position within the owning definition
    #[serde(default)]
    pub order: i32,
}

impl RoutineItem {
    /// Create a required, neutral item.
    pub fn new(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_type: item_type.into(),
            classification: Classification::Neutral,
            duration_minutes: None,
            sets: None,
            reps: None,
            weight_kg: None,
            distance_km: None,
            calories: None,
            is_optional: false,
            order: 0,
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Items are matched by name ignoring case and surrounding whitespace.
    pub fn same_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    /// Check the item is storable.
    pub fn validate(&self) -> RoutineResult<()> {
        if self.name.trim().is_empty() {
            return Err(RoutineError::validation("routine item name must not be empty"));
        }

        let non_negative = [
            ("durationMinutes", self.duration_minutes),
            ("weightKg", self.weight_kg),
            ("distanceKm", self.distance_km),
        ];
        for (field, value) in non_negative {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(RoutineError::validation(format!(
                        "{field} of item '{}' must be a non-negative number",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// One recurring commitment owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDefinition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub owner_id: String,
    /// Recurrence rule, serialized as `scheduleType` + `scheduleConfig`
    #[serde(flatten)]
    pub schedule: Schedule,
    /// `None` leaves the definition unplaced in the slot grid
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(default)]
    pub status: DefinitionStatus,
    #[serde(default)]
    pub items: Vec<RoutineItem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl RoutineDefinition {
    /// Create an active definition with no items.
    pub fn new(owner_id: impl Into<String>, schedule: Schedule, time_of_day: Option<TimeOfDay>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            schedule,
            time_of_day,
            status: DefinitionStatus::Active,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an item, placing it after the existing ones.
    pub fn with_item(mut self, item: RoutineItem) -> Self {
        let order = self.items.len() as i32;
        self.items.push(item.with_order(order));
        self
    }

    /// Whether the definition participates in the slot grid.
    pub fn is_active(&self) -> bool {
        self.status == DefinitionStatus::Active
    }

    /// Items sorted by their `order`, ties kept in list order.
    pub fn ordered_items(&self) -> Vec<RoutineItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| item.order);
        items
    }

    /// Check the definition is storable.
    pub fn validate(&self) -> RoutineResult<()> {
        self.schedule.validate()?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}
