//! Database layer for Selah

mod app_state;
mod connection;
mod conflict_log;
mod entry_store;
mod migrations;

pub use app_state::{
    AppStateRepository, LibSqlAppStateRepository, LEGACY_LAST_FETCH_KEY, MIGRATION_COMPLETED_KEY,
};
pub use connection::{Database, SyncConfig};
pub use conflict_log::{ConflictLog, LibSqlConflictLog};
pub use entry_store::{EntryStore, LibSqlEntryStore};
