//! Routine storage for unregistered sessions.
//!
//! A session keeps its routine as one embedded JSON array, each entry already
//! resolved to a single weekday and slot. An entry that no longer decodes
//! fails reads and writes alike.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::{RoutineError, RoutineResult};
use crate::routines::types::{DayOfWeek, RoutineItem, TimeOfDay};
use crate::storage::database::DatabaseError;
use crate::storage::routine_store::UpsertSummary;
use crate::storage::rows;

/// One entry of a session's embedded routine array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRoutine {
    /// Sunday = 0
    pub day_of_week: u8,
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub items: Vec<RoutineItem>,
}

impl SessionRoutine {
    pub fn new(day: DayOfWeek, time_of_day: TimeOfDay) -> Self {
        Self {
            day_of_week: day.index(),
            time_of_day,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: RoutineItem) -> Self {
        let order = self.items.len() as i32;
        self.items.push(item.with_order(order));
        self
    }

    /// Weekday of the entry, if in range.
    pub fn day(&self) -> Option<DayOfWeek> {
        DayOfWeek::from_index(self.day_of_week)
    }

    fn validate(&self) -> RoutineResult<()> {
        if self.day().is_none() {
            return Err(RoutineError::validation(format!(
                "dayOfWeek {} is out of range 0-6",
                self.day_of_week
            )));
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    fn same_slot(&self, other: &SessionRoutine) -> bool {
        self.day_of_week == other.day_of_week && self.time_of_day == other.time_of_day
    }
}

/// Store for session routine arrays.
pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Routine entries of a session; empty when the session has none.
    pub fn get_routines(&self, session_id: &str) -> RoutineResult<Vec<SessionRoutine>> {
        load_routines(self.conn, session_id)
    }

    /// Time the session's routine was last written.
    pub fn last_modified(&self, session_id: &str) -> RoutineResult<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT updated_at FROM session_routines WHERE session_id = ?1",
                params![session_id],
                |row| rows::timestamp(row, 0),
            )
            .optional()
            .map_err(RoutineError::from)
    }

    /// Merge entries by (day, slot); items merge by name.
    pub fn upsert_routines(
        &self,
        session_id: &str,
        routines: &[SessionRoutine],
    ) -> RoutineResult<UpsertSummary> {
        for routine in routines {
            routine.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stored = load_routines(&tx, session_id)?;
        let mut summary = UpsertSummary::default();

        for incoming in routines {
            match stored.iter_mut().find(|r| r.same_slot(incoming)) {
                Some(existing) => {
                    for item in &incoming.items {
                        match existing.items.iter_mut().find(|i| i.same_name(&item.name)) {
                            Some(current) => *current = item.clone(),
                            None => existing.items.push(item.clone()),
                        }
                    }
                    summary.updated += 1;
                }
                None => {
                    stored.push(incoming.clone());
                    summary.inserted += 1;
                }
            }
        }

        save_routines(&tx, session_id, &stored)?;
        tx.commit()?;

        tracing::info!(
            session_id,
            inserted = summary.inserted,
            updated = summary.updated,
            "Upserted session routines"
        );
        Ok(summary)
    }

    /// Remove an item from one day and slot of the session's routine.
    pub fn delete_item(
        &self,
        session_id: &str,
        day: DayOfWeek,
        time_of_day: TimeOfDay,
        item_name: &str,
    ) -> RoutineResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stored = load_routines(&tx, session_id)?;

        let mut removed = 0;
        for routine in stored
            .iter_mut()
            .filter(|r| r.day_of_week == day.index() && r.time_of_day == time_of_day)
        {
            let before = routine.items.len();
            routine.items.retain(|item| !item.same_name(item_name));
            removed += before - routine.items.len();
        }

        if removed == 0 {
            return Err(RoutineError::NotFound(format!(
                "no '{item_name}' item on {day} {time_of_day}"
            )));
        }

        save_routines(&tx, session_id, &stored)?;
        tx.commit()?;

        tracing::info!(session_id, %day, %time_of_day, item_name, "Deleted session routine item");
        Ok(())
    }
}

fn load_routines(conn: &Connection, session_id: &str) -> RoutineResult<Vec<SessionRoutine>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT routines_json FROM session_routines WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let entries: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| RoutineError::Store(DatabaseError::DeserializationError(e.to_string())))?;

    let mut routines = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let routine = serde_json::from_value::<SessionRoutine>(entry)
            .map_err(|e| e.to_string())
            .and_then(|routine| match routine.day() {
                Some(_) => Ok(routine),
                None => Err(format!("dayOfWeek {} is out of range 0-6", routine.day_of_week)),
            })
            .map_err(|reason| {
                tracing::error!(session_id, index, %reason, "Undecodable session routine");
                RoutineError::Store(DatabaseError::DeserializationError(format!(
                    "session {session_id} entry {index}: {reason}"
                )))
            })?;
        routines.push(routine);
    }

    Ok(routines)
}

fn save_routines(conn: &Connection, session_id: &str, routines: &[SessionRoutine]) -> RoutineResult<()> {
    let json = serde_json::to_string(routines)
        .map_err(|e| RoutineError::Store(DatabaseError::SerializationError(e.to_string())))?;

    conn.execute(
        "INSERT INTO session_routines (session_id, routines_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(session_id) DO UPDATE SET
             routines_json = excluded.routines_json,
             updated_at = excluded.updated_at",
        params![session_id, json, rows::format_timestamp(&Utc::now())],
    )?;
    Ok(())
}
