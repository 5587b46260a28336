//! Sleep routine storage, one row per owner or session.

use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{RoutineError, RoutineResult};
use crate::routines::sleep::SleepRoutine;
use crate::storage::database::DatabaseError;
use crate::storage::rows;

const TIME_FORMAT: &str = "%H:%M:%S";

/// Store for sleep routines, keyed by subject ("owner:<id>" or "session:<id>").
pub struct SleepStore<'a> {
    conn: &'a Connection,
}

impl<'a> SleepStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Sleep routine for a subject, if one was saved.
    pub fn get(&self, subject_key: &str) -> RoutineResult<Option<SleepRoutine>> {
        let row = self
            .conn
            .query_row(
                "SELECT bedtime, wake_time, pre_bed_items_json FROM sleep_routines
                 WHERE subject_key = ?1",
                params![subject_key],
                |row| {
                    Ok((
                        rows::optional_time(row, 0)?,
                        rows::optional_time(row, 1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((bedtime, wake_time, items_json)) = row else {
            return Ok(None);
        };

        let pre_bed_items: Vec<String> = serde_json::from_str(&items_json)
            .map_err(|e| RoutineError::Store(DatabaseError::DeserializationError(e.to_string())))?;

        Ok(Some(SleepRoutine {
            bedtime,
            wake_time,
            pre_bed_items,
        }))
    }

    /// Replace the subject's sleep routine.
    pub fn put(&self, subject_key: &str, routine: &SleepRoutine) -> RoutineResult<()> {
        routine.validate()?;

        let items_json = serde_json::to_string(&routine.pre_bed_items)
            .map_err(|e| RoutineError::Store(DatabaseError::SerializationError(e.to_string())))?;

        self.conn.execute(
            "INSERT INTO sleep_routines (subject_key, bedtime, wake_time, pre_bed_items_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(subject_key) DO UPDATE SET
                 bedtime = excluded.bedtime,
                 wake_time = excluded.wake_time,
                 pre_bed_items_json = excluded.pre_bed_items_json,
                 updated_at = excluded.updated_at",
            params![
                subject_key,
                routine.bedtime.map(format_time),
                routine.wake_time.map(format_time),
                items_json,
                rows::format_timestamp(&Utc::now()),
            ],
        )?;

        tracing::info!(subject_key, "Saved sleep routine");
        Ok(())
    }

    /// Time the subject's sleep routine was last written.
    pub fn last_modified(&self, subject_key: &str) -> RoutineResult<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT updated_at FROM sleep_routines WHERE subject_key = ?1",
                params![subject_key],
                |row| rows::timestamp(row, 0),
            )
            .optional()
            .map_err(RoutineError::from)
    }
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}
