//! Resolved sync conflict model

use serde::{Deserialize, Serialize};

/// Recorded sync conflict resolved by strategy (recency, field-merge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Entry involved in the conflict
    pub entry_id: String,
    /// Stored row's timestamp when the conflict occurred
    pub local_last_modified: i64,
    /// Incoming record's timestamp
    pub incoming_last_modified: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
