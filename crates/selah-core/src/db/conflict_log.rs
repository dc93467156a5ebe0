//! Conflict audit log implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::{EntryId, ResolvedConflict};
use libsql::Connection;

/// Trait for the conflict resolution audit log (async)
#[allow(async_fn_in_trait)]
pub trait ConflictLog {
    /// Record one resolved conflict
    async fn record(
        &self,
        entry_id: &EntryId,
        local_last_modified: i64,
        incoming_last_modified: i64,
        resolved_at: i64,
        strategy: &str,
    ) -> Result<()>;

    /// List recently resolved conflicts, newest first
    async fn list(&self, limit: usize) -> Result<Vec<ResolvedConflict>>;
}

/// libSQL implementation of `ConflictLog`
pub struct LibSqlConflictLog<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlConflictLog<'a> {
    /// Create a new log with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConflictLog for LibSqlConflictLog<'_> {
    async fn record(
        &self,
        entry_id: &EntryId,
        local_last_modified: i64,
        incoming_last_modified: i64,
        resolved_at: i64,
        strategy: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts (entry_id, local_last_modified, incoming_last_modified, resolved_at, strategy)
                 VALUES (?, ?, ?, ?, ?)",
                libsql::params![
                    entry_id.as_str(),
                    local_last_modified,
                    incoming_last_modified,
                    resolved_at,
                    strategy
                ],
            )
            .await?;
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<ResolvedConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, entry_id, local_last_modified, incoming_last_modified, resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                [limit as i64],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(ResolvedConflict {
                id: row.get(0)?,
                entry_id: row.get(1)?,
                local_last_modified: row.get(2)?,
                incoming_last_modified: row.get(3)?,
                resolved_at: row.get(4)?,
                strategy: row.get(5)?,
            });
        }
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_and_list() {
        let db = Database::open_in_memory().await.unwrap();
        let log = LibSqlConflictLog::new(db.connection());

        let id = EntryId::new();
        log.record(&id, 100, 200, 250, "recency").await.unwrap();
        log.record(&id, 300, 280, 350, "field-merge").await.unwrap();

        let conflicts = log.list(10).await.unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].strategy, "field-merge");
        assert_eq!(conflicts[1].strategy, "recency");
        assert_eq!(conflicts[1].entry_id, id.as_str());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_respects_limit() {
        let db = Database::open_in_memory().await.unwrap();
        let log = LibSqlConflictLog::new(db.connection());

        let id = EntryId::new();
        for i in 0..5 {
            log.record(&id, i, i + 1, i + 2, "recency").await.unwrap();
        }

        let conflicts = log.list(3).await.unwrap();
        assert_eq!(conflicts.len(), 3);
    }
}
