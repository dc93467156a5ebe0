//! App state repository implementation
//!
//! Small key/value store for process-wide persisted state: the legacy
//! migration flag and the last legacy fetch timestamp.

use crate::error::Result;
use libsql::Connection;

/// Key for the one-time legacy migration gate.
pub const MIGRATION_COMPLETED_KEY: &str = "legacy_migration_completed";

/// Key recording when legacy declarations were last fetched (unix ms).
pub const LEGACY_LAST_FETCH_KEY: &str = "legacy_last_fetch_at";

/// Trait for app state storage operations (async)
#[allow(async_fn_in_trait)]
pub trait AppStateRepository {
    /// Read a state value, `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a state value, overwriting any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `AppStateRepository`
pub struct LibSqlAppStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAppStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl AppStateRepository for LibSqlAppStateRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM app_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO app_state (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
