//! Merge policy for colliding cross-device writes.
//!
//! Resolution is a pure function of the conflicting inputs. The store
//! invokes the injected resolver inside its remote-change handling path;
//! nothing here touches storage or performs I/O.

use std::cmp::Ordering;

use crate::clock;
use crate::error::{Error, Result};
use crate::models::{Entry, EntrySnapshot};

/// A detected collision between writes to one record identity.
#[derive(Debug, Clone)]
pub enum EntryConflict {
    /// The same identity was created independently on two devices,
    /// producing distinct row instances that must collapse to one.
    Duplicate {
        /// Colliding instances; the stored instance first by convention
        candidates: Vec<Entry>,
    },
    /// Concurrent field-level edits to one record: the stored row,
    /// its pre-edit cached snapshot, and the incoming remote snapshot.
    Concurrent {
        source: Entry,
        cached: EntrySnapshot,
        incoming: EntrySnapshot,
    },
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The record that survives
    pub entry: Entry,
    /// Strategy name recorded in the audit log
    pub strategy: &'static str,
}

/// Pluggable merge policy invoked by the store on remote collisions.
pub trait ConflictResolver: Send + Sync {
    /// Resolve one conflict, or fail with `ConflictResolutionFailed` when
    /// no winner can be determined. Failures must be surfaced by the
    /// caller; a dropped conflict is silent data loss.
    fn resolve(&self, conflict: EntryConflict) -> Result<Resolution>;
}

/// Production policy: recency picks duplicate winners, field-level
/// last-writer-wins merges concurrent edits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencyResolver;

impl ConflictResolver for RecencyResolver {
    fn resolve(&self, conflict: EntryConflict) -> Result<Resolution> {
        match conflict {
            EntryConflict::Duplicate { candidates } => resolve_duplicate(candidates),
            EntryConflict::Concurrent {
                source,
                cached,
                incoming,
            } => Ok(resolve_concurrent(source, &cached, incoming)),
        }
    }
}

/// Pick the most recent instance. Timestamp ties break by lexicographic id
/// comparison; a full tie keeps the earliest-listed candidate, so ordering
/// never depends on store iteration order.
fn resolve_duplicate(candidates: Vec<Entry>) -> Result<Resolution> {
    let mut winner: Option<Entry> = None;

    for candidate in candidates {
        let better = match &winner {
            None => true,
            Some(current) => match candidate.last_modified.cmp(&current.last_modified) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => candidate.id.as_str() > current.id.as_str(),
            },
        };
        if better {
            winner = Some(candidate);
        }
    }

    winner.map_or_else(
        || {
            Err(Error::ConflictResolutionFailed(
                "empty conflict set".to_string(),
            ))
        },
        |entry| {
            Ok(Resolution {
                entry,
                strategy: "recency",
            })
        },
    )
}

/// Field-level merge of concurrent edits.
///
/// A source newer than its cached snapshot keeps every field it set; fields
/// it left null are backfilled from the cached snapshot. Otherwise every
/// field present in the incoming snapshot overwrites the source. Either way
/// the result is stamped with resolution time, strictly past all three
/// contributors, so the merged record can never re-trigger on the next pass.
fn resolve_concurrent(source: Entry, cached: &EntrySnapshot, incoming: EntrySnapshot) -> Resolution {
    let newest_input = source
        .last_modified
        .max(cached.last_modified)
        .max(incoming.last_modified);

    let mut merged = source;

    if merged.last_modified > cached.last_modified {
        if merged.book.is_none() {
            merged.book = cached.book.clone();
        }
        if merged.verse_reference.is_none() {
            merged.verse_reference = cached.verse_reference.clone();
        }
    } else {
        if let Some(text) = incoming.text {
            merged.text = text;
        }
        if incoming.book.is_some() {
            merged.book = incoming.book;
        }
        if incoming.verse_reference.is_some() {
            merged.verse_reference = incoming.verse_reference;
        }
        if let Some(category) = incoming.category {
            merged.category = category;
        }
        if let Some(is_favorite) = incoming.is_favorite {
            merged.is_favorite = is_favorite;
        }
    }

    merged.last_modified = clock::next_timestamp(newest_input);

    Resolution {
        entry: merged,
        strategy: "field-merge",
    }
}
