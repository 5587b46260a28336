//! Routine document type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RoutineError;

/// Lifecycle status of a routine document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Being edited, not yet in effect
    Draft,
    /// The owner's current routine
    Active,
    /// Superseded by a later activation
    Past,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Active => "active",
            DocumentStatus::Past => "past",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "active" => Ok(DocumentStatus::Active),
            "past" => Ok(DocumentStatus::Past),
            other => Err(RoutineError::validation(format!("unknown document status: {other}"))),
        }
    }
}

/// The free-text "my routine" document of an owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDocument {
    pub id: Uuid,
    pub owner_id: String,
    /// Markdown body
    pub content: String,
    /// Per-owner counter, never reused
    pub version: i64,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RoutineDocument {
    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    pub fn is_draft(&self) -> bool {
        self.status == DocumentStatus::Draft
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Snapshot an activation is based on.
///
/// Produced by `DocumentManager::prepare_activation` and checked again when
/// committed; if any of it changed in between, the commit is a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationPlan {
    pub owner_id: String,
    /// Draft to promote
    pub draft_id: Uuid,
    /// Active row to retire, if any
    pub previous_active_id: Option<Uuid>,
    /// Highest version over the owner's full history when planned
    pub expected_max_version: i64,
}

impl ActivationPlan {
    /// Version the draft receives when activated.
    pub fn next_version(&self) -> i64 {
        self.expected_max_version + 1
    }
}
