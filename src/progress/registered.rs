//! Progress for registered owners, read from normalized rows.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::ProgressSource;
use crate::error::RoutineResult;
use crate::routines::types::RoutineDefinition;
use crate::storage::routine_store::RoutineStore;

pub struct RegisteredProgress<'a> {
    store: RoutineStore<'a>,
    owner_id: &'a str,
}

impl<'a> RegisteredProgress<'a> {
    pub fn new(conn: &'a Connection, owner_id: &'a str) -> Self {
        Self {
            store: RoutineStore::new(conn),
            owner_id,
        }
    }
}

impl ProgressSource for RegisteredProgress<'_> {
    fn load_definitions(&self) -> RoutineResult<Vec<RoutineDefinition>> {
        self.store.list_active(self.owner_id)
    }

    fn last_modified(&self) -> RoutineResult<Option<DateTime<Utc>>> {
        self.store.last_modified(self.owner_id)
    }
}
