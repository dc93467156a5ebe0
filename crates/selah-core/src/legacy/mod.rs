//! One-time migration from the legacy declaration file.
//!
//! Earlier releases kept user declarations in a single JSON flat file. The
//! migration manager moves eligible records into the entry store exactly
//! once, gated by a persisted flag: the flag is only set when at least one
//! record migrated, so an empty legacy file leaves a later launch free to
//! retry once real data might exist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clock;
use crate::db::{LEGACY_LAST_FETCH_KEY, MIGRATION_COMPLETED_KEY};
use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, EntryKind, MigrationResult, MY_OWN_CATEGORY};
use crate::store::StoreService;
use crate::telemetry::TelemetrySink;

/// One record of the legacy declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDeclaration {
    pub text: String,
    #[serde(default)]
    pub book: Option<String>,
    #[serde(default)]
    pub verse_reference: Option<String>,
    pub category: String,
    #[serde(default)]
    pub is_favorite: bool,
    /// Declared content kind, partitioning records into collections
    pub kind: EntryKind,
    /// Last edit timestamp (unix ms) carried over when present
    #[serde(default)]
    pub last_edit: Option<i64>,
}

/// Source of legacy declarations and their post-migration cleanup.
#[allow(async_fn_in_trait)]
pub trait LegacySource {
    /// Fetch the full legacy declaration list. May fail on I/O or decode.
    async fn fetch_declarations(&self) -> Result<Vec<LegacyDeclaration>>;

    /// Delete the legacy data. Best-effort, invoked only after a
    /// successful migration.
    async fn cleanup(&self) -> Result<()>;
}

/// Legacy declaration file on disk, decoded as a JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LegacySource for JsonFileSource {
    async fn fetch_declarations(&self) -> Result<Vec<LegacyDeclaration>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let declarations = serde_json::from_str(&raw)?;
        Ok(declarations)
    }

    async fn cleanup(&self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Persisted migration gate, loaded at startup and passed into the
/// manager explicitly; nothing reads the flag ambiently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationState {
    /// Whether a previous launch completed the migration
    pub completed: bool,
}

impl MigrationState {
    /// Load the persisted state from the store.
    pub async fn load(store: &StoreService) -> Result<Self> {
        let value = store
            .state_value(MIGRATION_COMPLETED_KEY)
            .await
            .map_err(|e| Error::ContextNotAvailable(e.to_string()))?;
        Ok(Self {
            completed: value.as_deref() == Some("true"),
        })
    }

    /// Persist the current state to the store.
    pub async fn save(&self, store: &StoreService) -> Result<()> {
        store
            .set_state_value(
                MIGRATION_COMPLETED_KEY,
                if self.completed { "true" } else { "false" },
            )
            .await
    }
}

/// Runs the one-time legacy migration against the entry store.
pub struct MigrationManager<S: LegacySource> {
    store: StoreService,
    source: S,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<S: LegacySource> MigrationManager<S> {
    #[must_use]
    pub fn new(store: StoreService, source: S, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            store,
            source,
            telemetry,
        }
    }

    /// Migrate eligible legacy declarations into the entry store.
    ///
    /// Idempotent across launches through `state`: a completed run
    /// short-circuits, a failed run leaves the flag unset so the next
    /// launch retries. Every branch emits telemetry.
    pub async fn migrate_legacy_data(&self, state: &mut MigrationState) -> Result<MigrationResult> {
        if state.completed {
            tracing::info!("Legacy migration already completed; skipping");
            self.telemetry.emit(
                "legacy_migration_skipped",
                &[("reason", "already_completed".to_string())],
            );
            return Ok(MigrationResult::default());
        }

        let started = Instant::now();

        let declarations = match self.source.fetch_declarations().await {
            Ok(declarations) => declarations,
            Err(e) => {
                tracing::warn!("Legacy declaration fetch failed: {e}");
                self.telemetry
                    .emit("legacy_migration_failed", &[("error", e.to_string())]);
                return Err(e);
            }
        };
        self.store
            .set_state_value(LEGACY_LAST_FETCH_KEY, &clock::now_ms().to_string())
            .await?;

        let entries: Vec<(Entry, EntryKind)> = declarations
            .into_iter()
            .filter(|declaration| declaration.category == MY_OWN_CATEGORY)
            .map(build_entry)
            .collect();

        let journal_count = entries
            .iter()
            .filter(|(_, kind)| *kind == EntryKind::Journal)
            .count();
        let affirmation_count = entries.len() - journal_count;

        if let Err(e) = self.store.insert_many(&entries).await {
            let error = Error::MigrationFailed(e.to_string());
            self.telemetry
                .emit("legacy_migration_failed", &[("error", error.to_string())]);
            return Err(error);
        }

        let result = MigrationResult {
            journal_count,
            affirmation_count,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        if result.total() > 0 {
            state.completed = true;
            state.save(&self.store).await?;

            // Migration already succeeded; a failed cleanup only leaves
            // the stale file behind
            if let Err(e) = self.source.cleanup().await {
                tracing::warn!("Legacy file cleanup failed: {e}");
            }
        } else {
            tracing::info!("No eligible legacy declarations; leaving migration gate open");
        }

        self.telemetry.emit(
            "legacy_migration_completed",
            &[
                ("journal_count", result.journal_count.to_string()),
                ("affirmation_count", result.affirmation_count.to_string()),
                ("duration_ms", result.duration_ms.to_string()),
                ("flag_set", state.completed.to_string()),
            ],
        );

        Ok(result)
    }
}

fn build_entry(declaration: LegacyDeclaration) -> (Entry, EntryKind) {
    let stamp = declaration.last_edit.unwrap_or_else(clock::now_ms);
    let entry = Entry {
        id: EntryId::new(),
        text: declaration.text,
        book: declaration.book,
        verse_reference: declaration.verse_reference,
        category: declaration.category,
        is_favorite: declaration.is_favorite,
        created_at: stamp,
        last_modified: stamp,
    };
    (entry, declaration.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingTelemetry;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct StaticSource {
        declarations: Vec<LegacyDeclaration>,
        fail_fetch: bool,
    }

    impl StaticSource {
        fn with(declarations: Vec<LegacyDeclaration>) -> Self {
            Self {
                declarations,
                fail_fetch: false,
            }
        }

        const fn failing() -> Self {
            Self {
                declarations: Vec::new(),
                fail_fetch: true,
            }
        }
    }

    impl LegacySource for StaticSource {
        async fn fetch_declarations(&self) -> Result<Vec<LegacyDeclaration>> {
            if self.fail_fetch {
                return Err(Error::Database("legacy read failed".to_string()));
            }
            Ok(self.declarations.clone())
        }

        async fn cleanup(&self) -> Result<()> {
            Ok(())
        }
    }

    fn declaration(text: &str, kind: EntryKind, category: &str) -> LegacyDeclaration {
        LegacyDeclaration {
            text: text.to_string(),
            book: None,
            verse_reference: None,
            category: category.to_string(),
            is_favorite: false,
            kind,
            last_edit: Some(1_000),
        }
    }

    async fn manager(
        source: StaticSource,
    ) -> (
        MigrationManager<StaticSource>,
        StoreService,
        Arc<RecordingTelemetry>,
    ) {
        let store = StoreService::open_in_memory().await.unwrap();
        let telemetry = Arc::new(RecordingTelemetry::default());
        let manager = MigrationManager::new(store.clone(), source, telemetry.clone());
        (manager, store, telemetry)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn migrates_eligible_records_and_sets_flag() {
        let source = StaticSource::with(vec![
            declaration("journal one", EntryKind::Journal, MY_OWN_CATEGORY),
            declaration("journal two", EntryKind::Journal, MY_OWN_CATEGORY),
            declaration("affirmation", EntryKind::Affirmation, MY_OWN_CATEGORY),
            declaration("curated", EntryKind::Journal, "starter-pack"),
        ]);
        let (manager, store, _telemetry) = manager(source).await;
        let mut state = MigrationState::load(&store).await.unwrap();

        let result = manager.migrate_legacy_data(&mut state).await.unwrap();

        assert_eq!(result.journal_count, 2);
        assert_eq!(result.affirmation_count, 1);
        assert!(state.completed);
        assert!(MigrationState::load(&store).await.unwrap().completed);

        let journal = store.list(EntryKind::Journal).await.unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].created_at, 1_000);
        assert_eq!(journal[0].last_modified, 1_000);
        assert_eq!(store.list(EntryKind::Affirmation).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_run_is_a_no_op() {
        let source = StaticSource::with(vec![declaration(
            "once",
            EntryKind::Journal,
            MY_OWN_CATEGORY,
        )]);
        let (manager, store, telemetry) = manager(source).await;
        let mut state = MigrationState::load(&store).await.unwrap();

        manager.migrate_legacy_data(&mut state).await.unwrap();
        let second = manager.migrate_legacy_data(&mut state).await.unwrap();

        assert_eq!(second.total(), 0);
        assert_eq!(store.list(EntryKind::Journal).await.unwrap().len(), 1);
        assert!(telemetry
            .event_names()
            .contains(&"legacy_migration_skipped".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_legacy_list_leaves_flag_unset() {
        let source = StaticSource::with(vec![declaration(
            "curated only",
            EntryKind::Journal,
            "starter-pack",
        )]);
        let (manager, store, _telemetry) = manager(source).await;
        let mut state = MigrationState::load(&store).await.unwrap();

        let result = manager.migrate_legacy_data(&mut state).await.unwrap();

        assert_eq!(result.total(), 0);
        assert!(!state.completed);
        assert!(!MigrationState::load(&store).await.unwrap().completed);
        assert!(store.list(EntryKind::Journal).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_failure_surfaces_and_keeps_gate_open() {
        let (manager, store, telemetry) = manager(StaticSource::failing()).await;
        let mut state = MigrationState::load(&store).await.unwrap();

        let result = manager.migrate_legacy_data(&mut state).await;

        assert!(result.is_err());
        assert!(!state.completed);
        assert!(telemetry
            .event_names()
            .contains(&"legacy_migration_failed".to_string()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completed_telemetry_carries_counts() {
        let source = StaticSource::with(vec![declaration(
            "counted",
            EntryKind::Affirmation,
            MY_OWN_CATEGORY,
        )]);
        let (manager, store, telemetry) = manager(source).await;
        let mut state = MigrationState::load(&store).await.unwrap();

        manager.migrate_legacy_data(&mut state).await.unwrap();

        let events = telemetry.events();
        let completed = events
            .iter()
            .find(|event| event.name == "legacy_migration_completed")
            .unwrap();
        assert!(completed
            .params
            .contains(&("affirmation_count".to_string(), "1".to_string())));
        assert!(completed
            .params
            .contains(&("flag_set".to_string(), "true".to_string())));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn json_file_source_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("declarations.json");
        std::fs::write(
            &path,
            r#"[
                {
                    "text": "He restores my soul",
                    "book": "Psalms",
                    "verseReference": "23:3",
                    "category": "my-own",
                    "isFavorite": true,
                    "kind": "journal",
                    "lastEdit": 1700000000000
                }
            ]"#,
        )
        .unwrap();

        let source = JsonFileSource::new(&path);
        let declarations = source.fetch_declarations().await.unwrap();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].book.as_deref(), Some("Psalms"));
        assert_eq!(declarations[0].kind, EntryKind::Journal);

        source.cleanup().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn json_file_source_decode_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("declarations.json");
        std::fs::write(&path, "not json").unwrap();

        let source = JsonFileSource::new(&path);
        assert!(matches!(
            source.fetch_declarations().await,
            Err(Error::Serialization(_))
        ));
        // Failed fetch never deletes legacy data
        assert!(path.exists());
    }
}
