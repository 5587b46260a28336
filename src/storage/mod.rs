//! Storage module for database and configuration.

pub mod config;
pub mod database;
pub mod routine_store;
pub(crate) mod rows;
pub mod schema;
pub mod session_store;
pub mod sleep_store;

pub use config::AppConfig;
pub use database::{Database, DatabaseError};
pub use routine_store::{RoutineStore, UpsertSummary};
pub use session_store::{SessionRoutine, SessionStore};
pub use sleep_store::SleepStore;
