//! Data models for Selah

mod conflict;
mod entry;
mod migration;

pub use conflict::ResolvedConflict;
pub use entry::{Entry, EntryId, EntryKind, EntrySnapshot, NewEntry, MY_OWN_CATEGORY};
pub use migration::MigrationResult;
