//! Entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::clock;

/// Category marking user-authored content, as opposed to curated packs.
pub const MY_OWN_CATEGORY: &str = "my-own";

/// A unique identifier for an entry, using UUID v7 (time-sortable)
///
/// The id is the sync identity key across devices: assigned once at
/// creation, never mutated, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Create a new unique entry ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Which collection an entry belongs to.
///
/// Journal and affirmation entries are structurally identical; the kind tag
/// selects the collection a repository reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Journal,
    Affirmation,
}

impl EntryKind {
    /// Stable string form used in the `kind` column and in telemetry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Affirmation => "affirmation",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "journal" => Ok(Self::Journal),
            "affirmation" => Ok(Self::Affirmation),
            other => Err(format!("unknown entry kind: {other}")),
        }
    }
}

/// A user-authored devotional entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier
    pub id: EntryId,
    /// User-authored content
    pub text: String,
    /// Scripture book, when the entry references one
    pub book: Option<String>,
    /// Verse reference within the book
    pub verse_reference: Option<String>,
    /// Free-text classification; `"my-own"` for user-authored entries
    pub category: String,
    /// User-toggleable favorite flag
    pub is_favorite: bool,
    /// Creation timestamp (Unix ms), set once
    pub created_at: i64,
    /// Last write timestamp (Unix ms); the recency signal for conflict resolution
    pub last_modified: i64,
}

impl Entry {
    /// Create a new entry with the given text, stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let now = clock::now_ms();
        Self {
            id: EntryId::new(),
            text: text.into(),
            book: None,
            verse_reference: None,
            category: MY_OWN_CATEGORY.to_string(),
            is_favorite: false,
            created_at: now,
            last_modified: now,
        }
    }

    /// Snapshot of this entry's current field values.
    #[must_use]
    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            text: Some(self.text.clone()),
            book: self.book.clone(),
            verse_reference: self.verse_reference.clone(),
            category: Some(self.category.clone()),
            is_favorite: Some(self.is_favorite),
            last_modified: self.last_modified,
        }
    }
}

/// Fields for a to-be-created entry; identity and timestamps are assigned
/// by the repository on create.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub text: String,
    pub book: Option<String>,
    pub verse_reference: Option<String>,
    pub category: Option<String>,
    pub is_favorite: bool,
}

impl NewEntry {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_book(mut self, book: impl Into<String>) -> Self {
        self.book = Some(book.into());
        self
    }

    #[must_use]
    pub fn with_verse_reference(mut self, verse_reference: impl Into<String>) -> Self {
        self.verse_reference = Some(verse_reference.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub const fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }
}

/// Partial view of an entry's fields at a point in time.
///
/// Every content field is optional: `None` means the field is absent from
/// the snapshot, which the merge policy treats differently from a value.
/// Carries its own `last_modified` so recency comparisons need no row lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub text: Option<String>,
    pub book: Option<String>,
    pub verse_reference: Option<String>,
    pub category: Option<String>,
    pub is_favorite: Option<bool>,
    pub last_modified: i64,
}
