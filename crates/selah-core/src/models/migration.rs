//! Legacy migration result model

use serde::{Deserialize, Serialize};

/// Counts from one legacy migration run. Ephemeral, used for telemetry and
/// to decide whether the completed flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Journal entries migrated
    pub journal_count: usize,
    /// Affirmation entries migrated
    pub affirmation_count: usize,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl MigrationResult {
    /// Total entries migrated across both collections.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.journal_count + self.affirmation_count
    }
}
