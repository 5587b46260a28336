//! Progress adapters.
//!
//! Registered owners keep normalized definition rows; unregistered sessions
//! keep one embedded routine array. Both are turned into the same list of
//! [`RoutineDefinition`]s so the grid and completion logic never branch on
//! where the data came from.

pub mod registered;
pub mod session;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::RoutineResult;
use crate::routines::completion::{self, WeeklyProgress};
use crate::routines::grid::ReferenceWeek;
use crate::routines::types::RoutineDefinition;

pub use registered::RegisteredProgress;
pub use session::SessionProgress;

/// Whose routine a query is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ProgressSubject {
    /// Registered user
    Owner(String),
    /// Not-yet-registered session
    Session(String),
}

impl ProgressSubject {
    pub fn owner(id: impl Into<String>) -> Self {
        ProgressSubject::Owner(id.into())
    }

    pub fn session(id: impl Into<String>) -> Self {
        ProgressSubject::Session(id.into())
    }

    pub fn id(&self) -> &str {
        match self {
            ProgressSubject::Owner(id) | ProgressSubject::Session(id) => id,
        }
    }

    /// Key used for per-subject rows shared by both kinds.
    pub fn storage_key(&self) -> String {
        match self {
            ProgressSubject::Owner(id) => format!("owner:{id}"),
            ProgressSubject::Session(id) => format!("session:{id}"),
        }
    }

    /// The adapter reading this subject's routine.
    pub fn source<'a>(&'a self, conn: &'a Connection) -> Box<dyn ProgressSource + 'a> {
        match self {
            ProgressSubject::Owner(id) => Box::new(RegisteredProgress::new(conn, id)),
            ProgressSubject::Session(id) => Box::new(SessionProgress::new(conn, id)),
        }
    }
}

impl std::fmt::Display for ProgressSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// A storage shape that can feed the slot grid.
pub trait ProgressSource {
    /// Definitions in canonical form. Failed reads are errors, never an
    /// empty list.
    fn load_definitions(&self) -> RoutineResult<Vec<RoutineDefinition>>;

    /// Last write to the underlying routine, for callers caching progress.
    fn last_modified(&self) -> RoutineResult<Option<DateTime<Utc>>>;

    /// Weekly completion for the given week.
    fn weekly_progress(&self, week: &ReferenceWeek) -> RoutineResult<WeeklyProgress> {
        let definitions = self.load_definitions()?;
        Ok(completion::weekly_progress(&definitions, week))
    }
}
