//! Routine documents.
//!
//! The free-text "my routine" artifact an owner edits as a draft and then
//! activates. Each activation advances the owner's version counter and
//! retires the previous active document.

pub mod manager;
pub mod types;

// Re-exports for convenience
pub use manager::DocumentManager;
pub use types::{ActivationPlan, DocumentStatus, RoutineDocument};
