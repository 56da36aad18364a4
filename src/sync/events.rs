use crate::storage::{Bookmark, ChangeKind, RowChange};

/// Row-level notification from the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Insert(Bookmark),
    Update(Bookmark),
    Delete(i64),
}

impl FeedEvent {
    /// Identifier of the bookmark this event concerns.
    pub fn bookmark_id(&self) -> i64 {
        match self {
            FeedEvent::Insert(b) | FeedEvent::Update(b) => b.id,
            FeedEvent::Delete(id) => *id,
        }
    }
}

impl From<RowChange> for FeedEvent {
    fn from(change: RowChange) -> Self {
        match change.kind {
            ChangeKind::Insert => FeedEvent::Insert(change.record),
            ChangeKind::Update => FeedEvent::Update(change.record),
            ChangeKind::Delete => FeedEvent::Delete(change.record.id),
        }
    }
}

/// Events delivered to the session's event loop by background tasks.
///
/// Feed events carry the id of the subscription that produced them so that
/// anything still in the channel after a resubscription can be ignored.
#[derive(Debug)]
pub enum SyncEvent {
    /// One change-log entry for the subscribed owner, in store order.
    Feed {
        subscription: u64,
        seq: i64,
        event: FeedEvent,
    },
    /// Polling the change log failed; live updates are paused.
    FeedDegraded { subscription: u64, error: String },
    /// Polling succeeded again after a failure.
    FeedRecovered { subscription: u64 },
    /// A snapshot read finished.
    ///
    /// Fields:
    /// - `owner_id`: owner the snapshot was requested for
    /// - `generation`: refresh counter at request time (stale results are dropped)
    /// - `result`: the snapshot or an error message
    SnapshotLoaded {
        owner_id: String,
        generation: u64,
        result: Result<crate::storage::Snapshot, String>,
    },
    /// The store accepted a create request.
    BookmarkCreated { bookmark: Bookmark },
    /// A create request failed.
    CreateFailed { error: String },
    /// The store accepted a delete request (`removed` is false if the row was already gone).
    BookmarkDeleted { id: i64, removed: bool },
    /// A delete request failed; the entry stays visible.
    DeleteFailed { id: i64, error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(id: i64) -> Bookmark {
        Bookmark {
            id,
            owner_id: "u".to_string(),
            title: Arc::from("T"),
            url: Arc::from("https://t.example.com"),
            created_at: 0,
        }
    }

    #[test]
    fn test_row_change_conversion() {
        let delete = FeedEvent::from(RowChange {
            seq: 3,
            kind: ChangeKind::Delete,
            record: record(9),
        });
        assert_eq!(delete, FeedEvent::Delete(9));

        let update = FeedEvent::from(RowChange {
            seq: 2,
            kind: ChangeKind::Update,
            record: record(4),
        });
        assert_eq!(update.bookmark_id(), 4);
        assert!(matches!(update, FeedEvent::Update(_)));
    }
}
