//! Routine engine error types.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::storage::database::DatabaseError;

/// Errors surfaced by routine operations.
#[derive(Debug, Error)]
pub enum RoutineError {
    /// A concurrent writer changed the state this operation was based on.
    /// Callers should re-read and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The targeted draft, document or item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied input is malformed or out of range.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] DatabaseError),
}

impl RoutineError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RoutineError::Validation(message.into())
    }

    /// Whether retrying after a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RoutineError::Conflict(_))
    }
}

impl From<rusqlite::Error> for RoutineError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                RoutineError::Conflict(err.to_string())
            }
            _ => RoutineError::Store(DatabaseError::QueryFailed(err.to_string())),
        }
    }
}

/// Result type for routine operations.
pub type RoutineResult<T> = Result<T, RoutineError>;
