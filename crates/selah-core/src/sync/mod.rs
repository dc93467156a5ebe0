//! Sync request channel and remote change events.
//!
//! The repository nudges the sync transport after a durable create. The
//! nudge is a latency optimization, not a correctness requirement: it rides
//! an observable channel instead of a detached task, so its delivery (or
//! loss) can be asserted in tests without timing games.

use tokio::sync::mpsc;

use crate::models::{Entry, EntryKind};

/// A request sent to the sync transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    /// Push local writes as soon as possible
    Immediate,
}

/// Sending half handed to repositories. Fire-and-forget: sending never
/// blocks, and a closed channel drops the request with a debug log.
#[derive(Debug, Clone)]
pub struct SyncRequester {
    tx: Option<mpsc::UnboundedSender<SyncRequest>>,
}

impl SyncRequester {
    /// Requester with no transport attached; every request is dropped.
    #[must_use]
    pub const fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Ask the transport to sync now.
    pub fn request_now(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(SyncRequest::Immediate).is_err() {
            tracing::debug!("sync channel closed; dropping immediate sync request");
        }
    }
}

/// Create the requester and the receiving half the sync driver drains.
#[must_use]
pub fn sync_channel() -> (SyncRequester, mpsc::UnboundedReceiver<SyncRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncRequester { tx: Some(tx) }, rx)
}

/// A remote device's write, delivered by the sync transport.
///
/// Keyed by the record id inside `entry`; carries the incoming record's
/// full field values and `last_modified`.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    /// Collection the record belongs to
    pub kind: EntryKind,
    /// The incoming record as the remote device last wrote it
    pub entry: Entry,
}

impl RemoteChange {
    #[must_use]
    pub const fn new(kind: EntryKind, entry: Entry) -> Self {
        Self { kind, entry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_is_observable() {
        let (requester, mut rx) = sync_channel();
        requester.request_now();

        assert_eq!(rx.recv().await, Some(SyncRequest::Immediate));
    }

    #[test]
    fn test_closed_channel_is_tolerated() {
        let (requester, rx) = sync_channel();
        drop(rx);

        // Loss is tolerated; must not panic or error
        requester.request_now();
    }

    #[test]
    fn test_disconnected_requester_is_silent() {
        SyncRequester::disconnected().request_now();
    }
}
