//! Entry row storage

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId, EntryKind};
use libsql::Connection;

/// Trait for entry storage operations (async)
///
/// Row-level contract only: identity and timestamp bookkeeping belong to
/// the repository layer, and ordering/serialization to the store service.
#[allow(async_fn_in_trait)]
pub trait EntryStore {
    /// Insert a new entry; fails with `ConstraintViolation` if the id exists
    async fn insert(&self, entry: &Entry, kind: EntryKind) -> Result<()>;

    /// Insert or overwrite the full row for an entry
    async fn replace(&self, entry: &Entry, kind: EntryKind) -> Result<()>;

    /// Update a stored entry's mutable fields; fails with `NotFound` if absent
    async fn update(&self, entry: &Entry) -> Result<()>;

    /// Delete an entry; fails with `NotFound` if absent
    async fn delete(&self, id: &EntryId) -> Result<()>;

    /// Get an entry by id, regardless of kind
    async fn get(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// Get an entry by id within one collection
    async fn get_in(&self, kind: EntryKind, id: &EntryId) -> Result<Option<Entry>>;

    /// List a collection's entries, most recently modified first
    async fn list(&self, kind: EntryKind) -> Result<Vec<Entry>>;

    /// List a collection's favorite entries, most recently modified first
    async fn favorites(&self, kind: EntryKind) -> Result<Vec<Entry>>;

    /// Case-insensitive substring search over entry text
    async fn search(&self, kind: EntryKind, query: &str) -> Result<Vec<Entry>>;
}

/// libSQL implementation of `EntryStore`
pub struct LibSqlEntryStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlEntryStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &libsql::Row) -> Result<Entry> {
        let id: String = row.get(0)?;
        Ok(Entry {
            id: id.parse().unwrap_or_default(),
            text: row.get(1)?,
            book: row.get(2)?,
            verse_reference: row.get(3)?,
            category: row.get(4)?,
            is_favorite: row.get::<i32>(5)? != 0,
            created_at: row.get(6)?,
            last_modified: row.get(7)?,
        })
    }

    async fn collect_entries(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Entry>> {
        let mut rows = self.conn.query(sql, params).await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::parse_entry(&row)?);
        }
        Ok(entries)
    }

    async fn exists(&self, id: &EntryId) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM entries WHERE id = ?", [id.as_str()])
            .await?;
        Ok(rows.next().await?.is_some())
    }
}

/// Escape `%`, `_`, and the escape character itself for a LIKE pattern.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

const SELECT_COLUMNS: &str =
    "id, text, book, verse_reference, category, is_favorite, created_at, last_modified";

impl EntryStore for LibSqlEntryStore<'_> {
    async fn insert(&self, entry: &Entry, kind: EntryKind) -> Result<()> {
        // The service serializes writes, so check-then-insert cannot race
        if self.exists(&entry.id).await? {
            return Err(Error::ConstraintViolation(entry.id.to_string()));
        }

        self.conn
            .execute(
                "INSERT INTO entries (id, kind, text, book, verse_reference, category, is_favorite, created_at, last_modified)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    entry.id.as_str(),
                    kind.as_str(),
                    entry.text.clone(),
                    entry.book.clone(),
                    entry.verse_reference.clone(),
                    entry.category.clone(),
                    i32::from(entry.is_favorite),
                    entry.created_at,
                    entry.last_modified
                ],
            )
            .await?;

        Ok(())
    }

    async fn replace(&self, entry: &Entry, kind: EntryKind) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO entries (id, kind, text, book, verse_reference, category, is_favorite, created_at, last_modified)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    entry.id.as_str(),
                    kind.as_str(),
                    entry.text.clone(),
                    entry.book.clone(),
                    entry.verse_reference.clone(),
                    entry.category.clone(),
                    i32::from(entry.is_favorite),
                    entry.created_at,
                    entry.last_modified
                ],
            )
            .await?;

        Ok(())
    }

    async fn update(&self, entry: &Entry) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE entries
                 SET text = ?, book = ?, verse_reference = ?, category = ?, is_favorite = ?, last_modified = ?
                 WHERE id = ?",
                libsql::params![
                    entry.text.clone(),
                    entry.book.clone(),
                    entry.verse_reference.clone(),
                    entry.category.clone(),
                    i32::from(entry.is_favorite),
                    entry.last_modified,
                    entry.id.as_str()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(entry.id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?", [id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM entries WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_in(&self, kind: EntryKind, id: &EntryId) -> Result<Option<Entry>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM entries WHERE id = ? AND kind = ?"),
                [id.as_str(), kind.as_str().to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_entry(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        self.collect_entries(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE kind = ?
                 ORDER BY last_modified DESC"
            ),
            [kind.as_str()],
        )
        .await
    }

    async fn favorites(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        self.collect_entries(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE kind = ? AND is_favorite = 1
                 ORDER BY last_modified DESC"
            ),
            [kind.as_str()],
        )
        .await
    }

    async fn search(&self, kind: EntryKind, query: &str) -> Result<Vec<Entry>> {
        if query.trim().is_empty() {
            return self.list(kind).await;
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        self.collect_entries(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM entries
                 WHERE kind = ? AND LOWER(text) LIKE ? ESCAPE '\\'
                 ORDER BY last_modified DESC"
            ),
            [kind.as_str(), pattern.as_str()],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn entry(text: &str) -> Entry {
        Entry::new(text)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let mut e = entry("Grateful today");
        e.book = Some("Psalms".to_string());
        store.insert(&e, EntryKind::Journal).await.unwrap();

        let fetched = store.get(&e.id).await.unwrap().unwrap();
        assert_eq!(fetched, e);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_duplicate_id_rejected() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let e = entry("once");
        store.insert(&e, EntryKind::Journal).await.unwrap();

        let result = store.insert(&e, EntryKind::Journal).await;
        assert!(matches!(result, Err(Error::ConstraintViolation(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_scoped_by_kind_newest_first() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let mut first = entry("first");
        first.last_modified = 100;
        let mut second = entry("second");
        second.last_modified = 200;
        let other = entry("affirmation");

        store.insert(&first, EntryKind::Journal).await.unwrap();
        store.insert(&second, EntryKind::Journal).await.unwrap();
        store.insert(&other, EntryKind::Affirmation).await.unwrap();

        let journal = store.list(EntryKind::Journal).await.unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].text, "second");
        assert_eq!(journal[1].text, "first");

        let affirmations = store.list(EntryKind::Affirmation).await.unwrap();
        assert_eq!(affirmations.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_entry() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let result = store.update(&entry("ghost")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let e = entry("to delete");
        store.insert(&e, EntryKind::Journal).await.unwrap();
        store.delete(&e.id).await.unwrap();

        assert!(store.get(&e.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(&e.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_favorites() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        let mut fav = entry("starred");
        fav.is_favorite = true;
        store.insert(&fav, EntryKind::Journal).await.unwrap();
        store
            .insert(&entry("plain"), EntryKind::Journal)
            .await
            .unwrap();

        let favorites = store.favorites(EntryKind::Journal).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].text, "starred");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_case_insensitive_substring() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        store
            .insert(&entry("Morning Gratitude"), EntryKind::Journal)
            .await
            .unwrap();
        store
            .insert(&entry("evening prayer"), EntryKind::Journal)
            .await
            .unwrap();

        let results = store.search(EntryKind::Journal, "GRAT").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Morning Gratitude");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_escapes_like_wildcards() {
        let db = setup().await;
        let store = LibSqlEntryStore::new(db.connection());

        store
            .insert(&entry("100% sure"), EntryKind::Journal)
            .await
            .unwrap();
        store
            .insert(&entry("100 reasons"), EntryKind::Journal)
            .await
            .unwrap();

        let results = store.search(EntryKind::Journal, "100%").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "100% sure");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
