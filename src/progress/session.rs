//! Progress for unregistered sessions, read from the embedded routine array.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::ProgressSource;
use crate::error::RoutineResult;
use crate::routines::schedule::Schedule;
use crate::routines::types::RoutineDefinition;
use crate::storage::session_store::{SessionRoutine, SessionStore};

pub struct SessionProgress<'a> {
    store: SessionStore<'a>,
    session_id: &'a str,
}

impl<'a> SessionProgress<'a> {
    pub fn new(conn: &'a Connection, session_id: &'a str) -> Self {
        Self {
            store: SessionStore::new(conn),
            session_id,
        }
    }
}

/// A session entry is a weekly definition on its single day.
pub fn to_definition(session_id: &str, routine: &SessionRoutine) -> RoutineDefinition {
    let mut definition = RoutineDefinition::new(
        session_id,
        Schedule::weekly([routine.day_of_week]),
        Some(routine.time_of_day),
    );
    definition.items = routine.items.clone();
    definition
}

impl ProgressSource for SessionProgress<'_> {
    fn load_definitions(&self) -> RoutineResult<Vec<RoutineDefinition>> {
        Ok(self
            .store
            .get_routines(self.session_id)?
            .iter()
            .map(|routine| to_definition(self.session_id, routine))
            .collect())
    }

    fn last_modified(&self) -> RoutineResult<Option<DateTime<Utc>>> {
        self.store.last_modified(self.session_id)
    }
}
