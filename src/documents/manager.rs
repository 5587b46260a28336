//! Routine document lifecycle management.
//!
//! Per owner, over rows that are not soft-deleted, there is at most one
//! `active` and at most one `draft` document. Versions come from a single
//! counter over the owner's full history, deleted rows included, so a version
//! is never handed out twice. Activation retires the previous active row and
//! promotes the draft in one IMMEDIATE transaction guarded by
//! compare-and-swap checks; the schema's partial unique indexes back this up.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::types::{ActivationPlan, DocumentStatus, RoutineDocument};
use crate::error::{RoutineError, RoutineResult};
use crate::storage::rows;

const SELECT_DOCUMENT: &str = "SELECT id, owner_id, content, version, status, created_at, updated_at, deleted_at
     FROM routine_documents";

/// Manager for routine documents.
pub struct DocumentManager<'a> {
    conn: &'a Connection,
}

impl<'a> DocumentManager<'a> {
    /// Create a new document manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get a live document by ID.
    pub fn get(&self, id: Uuid) -> RoutineResult<Option<RoutineDocument>> {
        fetch_by_id(self.conn, id)
    }

    /// Get the owner's active document.
    pub fn get_active(&self, owner_id: &str) -> RoutineResult<Option<RoutineDocument>> {
        fetch_with_status(self.conn, owner_id, DocumentStatus::Active)
    }

    /// Get the owner's draft document.
    pub fn get_draft(&self, owner_id: &str) -> RoutineResult<Option<RoutineDocument>> {
        fetch_with_status(self.conn, owner_id, DocumentStatus::Draft)
    }

    /// Highest version ever assigned to the owner, 0 if none.
    pub fn max_version(&self, owner_id: &str) -> RoutineResult<i64> {
        max_version(self.conn, owner_id)
    }

    /// Replace the draft's content, or create a draft at the next version.
    pub fn create_or_replace_draft(
        &self,
        owner_id: &str,
        content: &str,
    ) -> RoutineResult<RoutineDocument> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let now = Utc::now();

        let document = match fetch_with_status(&tx, owner_id, DocumentStatus::Draft)? {
            Some(mut draft) => {
                tx.execute(
                    "UPDATE routine_documents SET content = ?1, updated_at = ?2 WHERE id = ?3",
                    params![content, rows::format_timestamp(&now), draft.id.to_string()],
                )?;
                draft.content = content.to_string();
                draft.updated_at = now;
                tracing::info!(owner_id, version = draft.version, "Replaced routine draft");
                draft
            }
            None => {
                let draft = RoutineDocument {
                    id: Uuid::new_v4(),
                    owner_id: owner_id.to_string(),
                    content: content.to_string(),
                    version: max_version(&tx, owner_id)? + 1,
                    status: DocumentStatus::Draft,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                };
                tx.execute(
                    "INSERT INTO routine_documents
                     (id, owner_id, content, version, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        draft.id.to_string(),
                        draft.owner_id,
                        draft.content,
                        draft.version,
                        draft.status.as_str(),
                        rows::format_timestamp(&draft.created_at),
                        rows::format_timestamp(&draft.updated_at),
                    ],
                )?;
                tracing::info!(owner_id, version = draft.version, "Created routine draft");
                draft
            }
        };

        tx.commit()?;
        Ok(document)
    }

    /// Read the state an activation depends on.
    ///
    /// Fails with `NotFound` when the owner has no draft.
    pub fn prepare_activation(&self, owner_id: &str) -> RoutineResult<ActivationPlan> {
        let draft = self
            .get_draft(owner_id)?
            .ok_or_else(|| RoutineError::NotFound(format!("no draft routine for owner {owner_id}")))?;
        let previous_active_id = self.get_active(owner_id)?.map(|doc| doc.id);

        Ok(ActivationPlan {
            owner_id: owner_id.to_string(),
            draft_id: draft.id,
            previous_active_id,
            expected_max_version: self.max_version(owner_id)?,
        })
    }

    /// Apply a prepared activation.
    ///
    /// The previous active row becomes `past` and the draft becomes `active`
    /// at `plan.next_version()`, both or neither. Any drift from the plan is
    /// a `Conflict` and leaves the store untouched.
    pub fn commit_activation(&self, plan: &ActivationPlan) -> RoutineResult<RoutineDocument> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let owner_id = plan.owner_id.as_str();
        let now = rows::format_timestamp(&Utc::now());

        let current_max = max_version(&tx, owner_id)?;
        if current_max != plan.expected_max_version {
            return Err(conflict(owner_id, format!(
                "version moved from {} to {current_max}",
                plan.expected_max_version
            )));
        }

        match plan.previous_active_id {
            Some(previous) => {
                let retired = tx.execute(
                    "UPDATE routine_documents SET status = 'past', updated_at = ?1
                     WHERE id = ?2 AND owner_id = ?3 AND status = 'active' AND deleted_at IS NULL",
                    params![now, previous.to_string(), owner_id],
                )?;
                if retired != 1 {
                    return Err(conflict(owner_id, "active routine changed".to_string()));
                }
            }
            None => {
                if fetch_with_status(&tx, owner_id, DocumentStatus::Active)?.is_some() {
                    return Err(conflict(owner_id, "another routine was activated".to_string()));
                }
            }
        }

        let promoted = tx.execute(
            "UPDATE routine_documents SET status = 'active', version = ?1, updated_at = ?2
             WHERE id = ?3 AND owner_id = ?4 AND status = 'draft' AND deleted_at IS NULL",
            params![plan.next_version(), now, plan.draft_id.to_string(), owner_id],
        )?;
        if promoted != 1 {
            return Err(conflict(owner_id, "draft is no longer pending".to_string()));
        }

        let document = fetch_by_id(&tx, plan.draft_id)?
            .ok_or_else(|| conflict(owner_id, "draft disappeared during activation".to_string()))?;
        tx.commit()?;

        tracing::info!(
            owner_id,
            version = document.version,
            retired = ?plan.previous_active_id,
            "Activated routine draft"
        );
        Ok(document)
    }

    /// Promote the owner's draft to the active routine.
    pub fn activate_draft(&self, owner_id: &str) -> RoutineResult<RoutineDocument> {
        let plan = self.prepare_activation(owner_id)?;
        self.commit_activation(&plan)
    }

    /// Live documents, newest version first.
    pub fn history(&self, owner_id: &str, limit: usize) -> RoutineResult<Vec<RoutineDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_DOCUMENT}
             WHERE owner_id = ?1 AND deleted_at IS NULL
             ORDER BY version DESC
             LIMIT ?2"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![owner_id, limit], parse_document_row)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(RoutineError::from)
    }

    /// Soft-delete one of the owner's documents.
    pub fn soft_delete(&self, owner_id: &str, id: Uuid) -> RoutineResult<()> {
        let deleted = self.conn.execute(
            "UPDATE routine_documents SET deleted_at = ?1
             WHERE id = ?2 AND owner_id = ?3 AND deleted_at IS NULL",
            params![rows::format_timestamp(&Utc::now()), id.to_string(), owner_id],
        )?;

        if deleted == 0 {
            return Err(RoutineError::NotFound(format!("routine document {id}")));
        }

        tracing::info!(owner_id, %id, "Soft-deleted routine document");
        Ok(())
    }
}

fn conflict(owner_id: &str, reason: String) -> RoutineError {
    tracing::warn!(owner_id, %reason, "Routine activation conflict");
    RoutineError::Conflict(format!("concurrent activation for owner {owner_id}: {reason}"))
}

fn max_version(conn: &Connection, owner_id: &str) -> RoutineResult<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM routine_documents WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )
    .map_err(RoutineError::from)
}

fn fetch_by_id(conn: &Connection, id: Uuid) -> RoutineResult<Option<RoutineDocument>> {
    conn.query_row(
        &format!("{SELECT_DOCUMENT} WHERE id = ?1 AND deleted_at IS NULL"),
        params![id.to_string()],
        parse_document_row,
    )
    .optional()
    .map_err(RoutineError::from)
}

fn fetch_with_status(
    conn: &Connection,
    owner_id: &str,
    status: DocumentStatus,
) -> RoutineResult<Option<RoutineDocument>> {
    conn.query_row(
        &format!("{SELECT_DOCUMENT} WHERE owner_id = ?1 AND status = ?2 AND deleted_at IS NULL"),
        params![owner_id, status.as_str()],
        parse_document_row,
    )
    .optional()
    .map_err(RoutineError::from)
}

/// Parse a database row into a RoutineDocument.
fn parse_document_row(row: &rusqlite::Row) -> rusqlite::Result<RoutineDocument> {
    Ok(RoutineDocument {
        id: rows::uuid(row, 0)?,
        owner_id: row.get(1)?,
        content: row.get(2)?,
        version: row.get(3)?,
        status: rows::parsed(row, 4)?,
        created_at: rows::timestamp(row, 5)?,
        updated_at: rows::timestamp(row, 6)?,
        deleted_at: rows::optional_timestamp(row, 7)?,
    })
}
