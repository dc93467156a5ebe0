//! Shared store service serializing all persistence operations.
//!
//! One `StoreService` owns the database behind a single async mutex: every
//! mutation acquires it, which is what keeps two writes to the same record
//! from interleaving inside one process. It also owns the per-collection
//! live feeds and the merge policy invoked when remote writes collide with
//! local ones.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{watch, Mutex};

use crate::clock;
use crate::db::{
    AppStateRepository, ConflictLog, Database, EntryStore, LibSqlAppStateRepository,
    LibSqlConflictLog, LibSqlEntryStore, SyncConfig,
};
use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, EntryKind, EntrySnapshot, ResolvedConflict};
use crate::resolver::{ConflictResolver, EntryConflict, RecencyResolver};
use crate::sync::RemoteChange;
use crate::telemetry::{TelemetrySink, TracingTelemetry};

/// How `apply_remote` disposed of an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// No local row existed; the record was inserted as-is
    Inserted,
    /// The local row already matched the incoming record
    Unchanged,
    /// A collision was resolved by the merge policy
    Resolved {
        /// Strategy the resolver reported
        strategy: &'static str,
    },
}

struct Feeds {
    journal: watch::Sender<Vec<Entry>>,
    affirmation: watch::Sender<Vec<Entry>>,
}

impl Feeds {
    const fn sender(&self, kind: EntryKind) -> &watch::Sender<Vec<Entry>> {
        match kind {
            EntryKind::Journal => &self.journal,
            EntryKind::Affirmation => &self.affirmation,
        }
    }
}

/// Thread-safe service for store and repository operations.
#[derive(Clone)]
pub struct StoreService {
    db: Arc<Mutex<Database>>,
    feeds: Arc<Feeds>,
    /// Pre-edit snapshots of records with local writes not yet synced
    pending: Arc<StdMutex<HashMap<EntryId, EntrySnapshot>>>,
    resolver: Arc<dyn ConflictResolver>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl StoreService {
    /// Open a store at the given filesystem path.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        sync_config: Option<SyncConfig>,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if let Some(config) = sync_config {
            tracing::info!(
                "Sync enabled with remote: {}",
                config.url.as_deref().unwrap_or("unknown")
            );
            Database::open_with_sync(&db_path, config).await?
        } else {
            tracing::info!("Running in local-only mode (no sync config)");
            Database::open(&db_path).await?
        };

        Self::from_database(db).await
    }

    /// Open a local-only store at the given path.
    pub async fn open_local_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_path(db_path, None).await
    }

    /// Open a sync-enabled store at the given path.
    pub async fn open_sync_path(
        db_path: impl Into<PathBuf>,
        sync_config: SyncConfig,
    ) -> Result<Self> {
        Self::open_path(db_path, Some(sync_config)).await
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        // Prime both feeds so subscribers see the current result set
        // immediately, before any write happens in this process.
        let journal;
        let affirmation;
        {
            let store = LibSqlEntryStore::new(db.connection());
            journal = store.list(EntryKind::Journal).await?;
            affirmation = store.list(EntryKind::Affirmation).await?;
        }

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            feeds: Arc::new(Feeds {
                journal: watch::Sender::new(journal),
                affirmation: watch::Sender::new(affirmation),
            }),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            resolver: Arc::new(RecencyResolver),
            telemetry: Arc::new(TracingTelemetry),
        })
    }

    /// Replace the merge policy invoked on remote collisions.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Insert a new entry; `ConstraintViolation` when the id already exists.
    pub async fn insert(&self, entry: &Entry, kind: EntryKind) -> Result<()> {
        let db = self.db.lock().await;
        let store = LibSqlEntryStore::new(db.connection());
        store.insert(entry, kind).await?;
        self.refresh_feed(&store, kind).await
    }

    /// Update a stored entry; `NotFound` when the id is absent.
    ///
    /// Captures the record's pre-edit state so a remote write colliding
    /// before the next sync resolves against the correct cached snapshot.
    pub async fn update(&self, entry: &Entry, kind: EntryKind) -> Result<()> {
        let db = self.db.lock().await;
        let store = LibSqlEntryStore::new(db.connection());

        let current = store
            .get(&entry.id)
            .await?
            .ok_or_else(|| Error::NotFound(entry.id.to_string()))?;
        self.remember_pending(entry.id, current.snapshot());

        store.update(entry).await?;
        self.refresh_feed(&store, kind).await
    }

    /// Delete an entry; `NotFound` when the id is absent.
    pub async fn delete(&self, id: &EntryId, kind: EntryKind) -> Result<()> {
        let db = self.db.lock().await;
        let store = LibSqlEntryStore::new(db.connection());
        store.delete(id).await?;
        self.forget_pending(id);
        self.refresh_feed(&store, kind).await
    }

    /// Insert a batch of entries in a single all-or-nothing transaction.
    pub async fn insert_many(&self, entries: &[(Entry, EntryKind)]) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let store = LibSqlEntryStore::new(conn);

        conn.execute("BEGIN TRANSACTION", ()).await?;
        for (entry, kind) in entries {
            if let Err(e) = store.insert(entry, *kind).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        }
        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        self.refresh_feed(&store, EntryKind::Journal).await?;
        self.refresh_feed(&store, EntryKind::Affirmation).await
    }

    /// Fetch an entry by id.
    pub async fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryStore::new(db.connection()).get(id).await
    }

    /// Fetch an entry by id within one collection.
    pub async fn get_in(&self, kind: EntryKind, id: &EntryId) -> Result<Option<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryStore::new(db.connection()).get_in(kind, id).await
    }

    /// List a collection's entries, most recently modified first.
    pub async fn list(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryStore::new(db.connection()).list(kind).await
    }

    /// List a collection's favorites.
    pub async fn favorites(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryStore::new(db.connection()).favorites(kind).await
    }

    /// Case-insensitive substring search over a collection's text.
    pub async fn search(&self, kind: EntryKind, query: &str) -> Result<Vec<Entry>> {
        let db = self.db.lock().await;
        LibSqlEntryStore::new(db.connection())
            .search(kind, query)
            .await
    }

    /// Subscribe to a collection's full result set.
    ///
    /// The current result set is available immediately; the feed re-emits
    /// the whole set, coalesced, whenever any record in the collection
    /// changes. Receivers may be awaited on any task or runtime thread.
    #[must_use]
    pub fn subscribe(&self, kind: EntryKind) -> watch::Receiver<Vec<Entry>> {
        self.feeds.sender(kind).subscribe()
    }

    /// Apply one remote device's write, resolving any collision with local
    /// state through the injected merge policy before the result becomes
    /// visible to subscribers.
    pub async fn apply_remote(&self, change: RemoteChange) -> Result<RemoteOutcome> {
        let db = self.db.lock().await;
        let store = LibSqlEntryStore::new(db.connection());

        let Some(local) = store.get(&change.entry.id).await? else {
            store.insert(&change.entry, change.kind).await?;
            self.refresh_feed(&store, change.kind).await?;
            return Ok(RemoteOutcome::Inserted);
        };

        let cached = self.take_pending(&change.entry.id);

        if local == change.entry {
            return Ok(RemoteOutcome::Unchanged);
        }

        let local_last_modified = local.last_modified;
        let incoming_last_modified = change.entry.last_modified;

        let conflict = cached.map_or_else(
            || EntryConflict::Duplicate {
                candidates: vec![local.clone(), change.entry.clone()],
            },
            |cached| EntryConflict::Concurrent {
                source: local.clone(),
                cached,
                incoming: change.entry.snapshot(),
            },
        );

        let resolution = match self.resolver.resolve(conflict) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.telemetry.emit(
                    "conflict_resolution_failed",
                    &[
                        ("entry_id", change.entry.id.as_str()),
                        ("error", e.to_string()),
                    ],
                );
                return Err(e);
            }
        };

        store.replace(&resolution.entry, change.kind).await?;

        let resolved_at = clock::now_ms();
        LibSqlConflictLog::new(db.connection())
            .record(
                &change.entry.id,
                local_last_modified,
                incoming_last_modified,
                resolved_at,
                resolution.strategy,
            )
            .await?;
        self.telemetry.emit(
            "sync_conflict_resolved",
            &[
                ("entry_id", change.entry.id.as_str()),
                ("strategy", resolution.strategy.to_string()),
            ],
        );

        self.refresh_feed(&store, change.kind).await?;
        Ok(RemoteOutcome::Resolved {
            strategy: resolution.strategy,
        })
    }

    /// List recently resolved sync conflicts.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<ResolvedConflict>> {
        let db = self.db.lock().await;
        LibSqlConflictLog::new(db.connection()).list(limit).await
    }

    /// Read a persisted app-state value.
    pub async fn state_value(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        LibSqlAppStateRepository::new(db.connection()).get(key).await
    }

    /// Write a persisted app-state value.
    pub async fn set_state_value(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlAppStateRepository::new(db.connection())
            .set(key, value)
            .await
    }

    /// Sync with the remote database when sync is configured, then refresh
    /// the feeds from the replica and drop pending snapshots (local writes
    /// are pushed, so later collisions are no longer concurrent edits).
    pub async fn sync(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.sync().await?;
        self.mark_synced();

        let store = LibSqlEntryStore::new(db.connection());
        self.refresh_feed(&store, EntryKind::Journal).await?;
        self.refresh_feed(&store, EntryKind::Affirmation).await
    }

    /// Returns whether sync is configured for this store.
    pub async fn is_sync_enabled(&self) -> bool {
        let db = self.db.lock().await;
        db.is_sync_enabled()
    }

    /// Drop all pending pre-edit snapshots.
    pub fn mark_synced(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    /// Pre-edit snapshot currently held for a record, if any.
    #[must_use]
    pub fn pending_snapshot(&self, id: &EntryId) -> Option<EntrySnapshot> {
        self.pending
            .lock()
            .ok()
            .and_then(|pending| pending.get(id).cloned())
    }

    // Keep the FIRST pre-edit snapshot per record: successive local edits
    // still resolve against the baseline the remote device last saw.
    fn remember_pending(&self, id: EntryId, snapshot: EntrySnapshot) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.entry(id).or_insert(snapshot);
        }
    }

    fn take_pending(&self, id: &EntryId) -> Option<EntrySnapshot> {
        self.pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(id))
    }

    fn forget_pending(&self, id: &EntryId) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(id);
        }
    }

    async fn refresh_feed(&self, store: &LibSqlEntryStore<'_>, kind: EntryKind) -> Result<()> {
        let entries = store.list(kind).await?;
        self.feeds.sender(kind).send_replace(entries);
        Ok(())
    }
}
