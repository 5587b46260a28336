//! Routine service: the operations callers use, over one database.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::{DocumentManager, RoutineDocument};
use crate::error::RoutineResult;
use crate::onboarding::OnboardingStatus;
use crate::progress::ProgressSubject;
use crate::routines::completion::WeeklyProgress;
use crate::routines::grid::ReferenceWeek;
use crate::routines::sleep::{SleepProgress, SleepRoutine};
use crate::routines::types::{DayOfWeek, RoutineDefinition, TimeOfDay};
use crate::storage::config::AppConfig;
use crate::storage::{
    Database, RoutineStore, SessionRoutine, SessionStore, SleepStore, UpsertSummary,
};

/// Which item to remove from the weekly routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSelector {
    pub day: DayOfWeek,
    pub time_of_day: TimeOfDay,
    pub item_name: String,
}

impl ItemSelector {
    pub fn new(day: DayOfWeek, time_of_day: TimeOfDay, item_name: impl Into<String>) -> Self {
        Self {
            day,
            time_of_day,
            item_name: item_name.into(),
        }
    }
}

/// Routine lifecycle and weekly completion over one database.
pub struct RoutineService {
    db: Database,
    history_limit: usize,
}

impl RoutineService {
    /// Default number of documents returned by [`RoutineService::history`].
    pub const DEFAULT_HISTORY_LIMIT: usize = 20;

    pub fn new(db: Database) -> Self {
        Self {
            db,
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Open the database the configuration points at.
    pub fn open(config: &AppConfig) -> RoutineResult<Self> {
        let path = config.database_path();
        let db = Database::open_with_timeout(&path, config.database.busy_timeout())?;
        tracing::info!(path = %path.display(), "Opened routine database");

        Ok(Self {
            db,
            history_limit: config.progress.history_limit,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn documents(&self) -> DocumentManager<'_> {
        DocumentManager::new(self.db.connection())
    }

    fn definitions(&self) -> RoutineStore<'_> {
        RoutineStore::new(self.db.connection())
    }

    fn sessions(&self) -> SessionStore<'_> {
        SessionStore::new(self.db.connection())
    }

    fn sleep(&self) -> SleepStore<'_> {
        SleepStore::new(self.db.connection())
    }

    // Routine documents

    pub fn get_active_document(&self, owner_id: &str) -> RoutineResult<Option<RoutineDocument>> {
        self.documents().get_active(owner_id)
    }

    pub fn get_draft_document(&self, owner_id: &str) -> RoutineResult<Option<RoutineDocument>> {
        self.documents().get_draft(owner_id)
    }

    pub fn get_document(&self, id: Uuid) -> RoutineResult<Option<RoutineDocument>> {
        self.documents().get(id)
    }

    pub fn create_or_replace_draft(
        &self,
        owner_id: &str,
        content: &str,
    ) -> RoutineResult<RoutineDocument> {
        self.documents().create_or_replace_draft(owner_id, content)
    }

    /// Promote the draft.
    ///
    /// A losing concurrent call gets `Conflict` when the winner commits after
    /// this call read the draft, and `NotFound` when the winner had already
    /// consumed it.
    pub fn activate_draft(&self, owner_id: &str) -> RoutineResult<RoutineDocument> {
        self.documents().activate_draft(owner_id)
    }

    /// Live documents, newest version first. `None` uses the configured limit.
    pub fn history(
        &self,
        owner_id: &str,
        limit: Option<usize>,
    ) -> RoutineResult<Vec<RoutineDocument>> {
        self.documents()
            .history(owner_id, limit.unwrap_or(self.history_limit))
    }

    pub fn delete_document(&self, owner_id: &str, id: Uuid) -> RoutineResult<()> {
        self.documents().soft_delete(owner_id, id)
    }

    // Routine definitions

    pub fn upsert_definitions(
        &self,
        owner_id: &str,
        definitions: &[RoutineDefinition],
    ) -> RoutineResult<UpsertSummary> {
        self.definitions().upsert_definitions(owner_id, definitions)
    }

    pub fn list_definitions(&self, owner_id: &str) -> RoutineResult<Vec<RoutineDefinition>> {
        self.definitions().list_definitions(owner_id)
    }

    pub fn get_definition(
        &self,
        owner_id: &str,
        id: Uuid,
    ) -> RoutineResult<Option<RoutineDefinition>> {
        self.definitions().get_definition(owner_id, id)
    }

    pub fn archive_definition(&self, owner_id: &str, id: Uuid) -> RoutineResult<()> {
        self.definitions().archive_definition(owner_id, id)
    }

    pub fn upsert_session_routines(
        &self,
        session_id: &str,
        routines: &[SessionRoutine],
    ) -> RoutineResult<UpsertSummary> {
        self.sessions().upsert_routines(session_id, routines)
    }

    pub fn session_routines(&self, session_id: &str) -> RoutineResult<Vec<SessionRoutine>> {
        self.sessions().get_routines(session_id)
    }

    /// Remove one item from one day and slot of the subject's routine.
    pub fn delete_item(&self, subject: &ProgressSubject, selector: &ItemSelector) -> RoutineResult<()> {
        let ItemSelector {
            day,
            time_of_day,
            item_name,
        } = selector;

        match subject {
            ProgressSubject::Owner(owner_id) => {
                self.definitions()
                    .delete_item(owner_id, *day, *time_of_day, item_name)
            }
            ProgressSubject::Session(session_id) => {
                self.sessions()
                    .delete_item(session_id, *day, *time_of_day, item_name)
            }
        }
    }

    /// When the subject's routine last changed. Cached progress older than
    /// this is stale.
    pub fn last_modified(&self, subject: &ProgressSubject) -> RoutineResult<Option<DateTime<Utc>>> {
        subject.source(self.db.connection()).last_modified()
    }

    // Progress

    /// Weekly completion for the week containing `date` (today when `None`).
    pub fn weekly_progress(
        &self,
        subject: &ProgressSubject,
        date: Option<NaiveDate>,
    ) -> RoutineResult<WeeklyProgress> {
        let week = date
            .map(ReferenceWeek::containing)
            .unwrap_or_else(ReferenceWeek::current);
        subject.source(self.db.connection()).weekly_progress(&week)
    }

    // Sleep routine

    pub fn set_sleep_routine(
        &self,
        subject: &ProgressSubject,
        routine: &SleepRoutine,
    ) -> RoutineResult<()> {
        self.sleep().put(&subject.storage_key(), routine)
    }

    pub fn get_sleep_routine(&self, subject: &ProgressSubject) -> RoutineResult<Option<SleepRoutine>> {
        self.sleep().get(&subject.storage_key())
    }

    /// Completion of the sleep routine; an unsaved routine is missing everything.
    pub fn sleep_progress(&self, subject: &ProgressSubject) -> RoutineResult<SleepProgress> {
        let routine = self.get_sleep_routine(subject)?.unwrap_or_default();
        Ok(SleepProgress::from(&routine))
    }

    // Onboarding

    pub fn onboarding_status(
        &self,
        subject: &ProgressSubject,
        date: Option<NaiveDate>,
    ) -> RoutineResult<OnboardingStatus> {
        let weekly = self.weekly_progress(subject, date)?;
        let sleep = self.get_sleep_routine(subject)?;
        let status = OnboardingStatus::evaluate(&weekly, sleep.as_ref());

        tracing::debug!(
            %subject,
            step = %status.current_step,
            complete = status.is_complete,
            "Evaluated onboarding"
        );
        Ok(status)
    }
}
