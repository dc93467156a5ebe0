//! Entry repositories
//!
//! One repository per collection (journal, affirmation), both the same
//! struct parameterized by the kind tag. The repository owns identity and
//! timestamp bookkeeping on write; durability and ordering belong to the
//! store service it delegates to.

use tokio::sync::watch;

use crate::clock;
use crate::error::Result;
use crate::models::{Entry, EntryId, EntryKind, NewEntry, MY_OWN_CATEGORY};
use crate::store::StoreService;
use crate::sync::SyncRequester;

/// CRUD and query façade for one entry collection.
#[derive(Clone)]
pub struct EntryRepository {
    store: StoreService,
    kind: EntryKind,
    sync: SyncRequester,
}

impl EntryRepository {
    /// Create a repository scoped to the given collection.
    #[must_use]
    pub const fn new(store: StoreService, kind: EntryKind, sync: SyncRequester) -> Self {
        Self { store, kind, sync }
    }

    /// Repository over the journal collection.
    #[must_use]
    pub const fn journal(store: StoreService, sync: SyncRequester) -> Self {
        Self::new(store, EntryKind::Journal, sync)
    }

    /// Repository over the affirmation collection.
    #[must_use]
    pub const fn affirmation(store: StoreService, sync: SyncRequester) -> Self {
        Self::new(store, EntryKind::Affirmation, sync)
    }

    /// The collection this repository reads and writes.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Create a new entry from the given fields.
    ///
    /// Assigns a fresh id, stamps `created_at` and `last_modified` with the
    /// current time, and persists. After the durable commit, nudges the
    /// sync transport to push soon; the nudge is fire-and-forget.
    pub async fn create(&self, new: NewEntry) -> Result<Entry> {
        let now = clock::now_ms();
        let entry = Entry {
            id: EntryId::new(),
            text: new.text,
            book: new.book,
            verse_reference: new.verse_reference,
            category: new.category.unwrap_or_else(|| MY_OWN_CATEGORY.to_string()),
            is_favorite: new.is_favorite,
            created_at: now,
            last_modified: now,
        };

        self.store.insert(&entry, self.kind).await?;
        self.sync.request_now();
        Ok(entry)
    }

    /// Persist edits to an entry, refreshing `last_modified`.
    pub async fn update(&self, mut entry: Entry) -> Result<Entry> {
        entry.last_modified = clock::next_timestamp(entry.last_modified);
        self.store.update(&entry, self.kind).await?;
        Ok(entry)
    }

    /// Flip an entry's favorite flag, refreshing `last_modified`.
    pub async fn toggle_favorite(&self, mut entry: Entry) -> Result<Entry> {
        entry.is_favorite = !entry.is_favorite;
        self.update(entry).await
    }

    /// Delete an entry.
    pub async fn delete(&self, entry: &Entry) -> Result<()> {
        self.store.delete(&entry.id, self.kind).await
    }

    /// All entries in this collection, most recently modified first.
    pub async fn fetch(&self) -> Result<Vec<Entry>> {
        self.store.list(self.kind).await
    }

    /// Zero or one entry by id.
    ///
    /// Returns `None` for ids stored under the other collection.
    pub async fn fetch_by_id(&self, id: &EntryId) -> Result<Option<Entry>> {
        self.store.get_in(self.kind, id).await
    }

    /// Favorite entries in this collection.
    pub async fn fetch_favorites(&self) -> Result<Vec<Entry>> {
        self.store.favorites(self.kind).await
    }

    /// Entries whose text contains the query, case-insensitively.
    pub async fn search(&self, text: &str) -> Result<Vec<Entry>> {
        self.store.search(self.kind, text).await
    }

    /// Live feed of this collection's full result set.
    pub fn observe(&self) -> watch::Receiver<Vec<Entry>> {
        self.store.subscribe(self.kind)
    }
}
