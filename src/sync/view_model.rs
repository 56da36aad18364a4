use std::borrow::Cow;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clipboard::ClipboardSink;
use crate::storage::{Bookmark, Database, Snapshot};
use crate::util::{validate_bookmark_url, MAX_TITLE_LENGTH};

use super::copy_mark::CopyMark;
use super::error::{SyncError, ValidationError};
use super::events::{FeedEvent, SyncEvent};
use super::filter::{Classification, SearchFilter};
use super::list::BookmarkList;
use super::subscription::{subscribe_changes, FeedSubscription};
use super::task::{catch_task_panic, send_event};

// ============================================================================
// Presentation-facing Types
// ============================================================================

/// State of the live change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not subscribed (before the first subscribe, or after sign out).
    Idle,
    Live,
    /// Subscription failed or polling is failing; the list still works
    /// from the last snapshot.
    Degraded,
}

/// One-shot message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(Cow<'static, str>),
    Error(SyncError),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Info(msg) => f.write_str(msg),
            Notice::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Check a new bookmark's fields. Returns the trimmed title and url.
pub fn validate_new_bookmark(title: &str, url: &str) -> Result<(String, String), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_LENGTH,
        });
    }
    validate_bookmark_url(url)?;
    Ok((title.to_string(), url.trim().to_string()))
}

// ============================================================================
// View Model
// ============================================================================

/// Live bookmark list for one session.
///
/// Owns the in-memory sequence and reconciles three inputs into it: snapshot
/// reads from the store, change feed events, and the user's intents. All
/// mutation happens on the session's event loop through `&mut self`; store
/// calls run as spawned tasks that report back through the [`SyncEvent`]
/// channel, so feed events keep flowing while a request is in flight.
///
/// Creates and deletes are not applied locally. The list converges through
/// the change feed (and, for creates, a snapshot refresh).
pub struct BookmarkViewModel {
    db: Database,
    owner_id: String,
    poll_interval: Duration,
    tx: mpsc::Sender<SyncEvent>,
    clipboard: Box<dyn ClipboardSink>,

    list: BookmarkList,
    filter: SearchFilter,
    copy_mark: CopyMark,

    subscription: Option<FeedSubscription>,
    next_subscription_id: u64,
    sync_state: SyncState,

    /// Change-log position reflected by the last loaded snapshot. Feed
    /// events at or below it are already part of the list.
    seeded_head: i64,
    /// Incremented per refresh; stale snapshot results are dropped.
    snapshot_generation: u64,
    snapshot_handle: Option<JoinHandle<()>>,
    /// Feed events applied while a snapshot read is in flight. Replayed on
    /// top of the snapshot when it lands.
    replay: Option<Vec<(i64, FeedEvent)>>,

    pending_creates: usize,
    deleting: HashSet<i64>,
}

impl BookmarkViewModel {
    pub fn new(
        db: Database,
        owner_id: &str,
        poll_interval: Duration,
        tx: mpsc::Sender<SyncEvent>,
        clipboard: Box<dyn ClipboardSink>,
    ) -> Self {
        Self {
            db,
            owner_id: owner_id.to_string(),
            poll_interval,
            tx,
            clipboard,
            list: BookmarkList::new(),
            filter: SearchFilter::default(),
            copy_mark: CopyMark::default(),
            subscription: None,
            next_subscription_id: 0,
            sync_state: SyncState::Idle,
            seeded_head: 0,
            snapshot_generation: 0,
            snapshot_handle: None,
            replay: None,
            pending_creates: 0,
            deleting: HashSet::new(),
        }
    }

    // ========================================================================
    // Seeding and Refresh
    // ========================================================================

    /// Replace the list with `bookmarks` verbatim.
    pub fn seed(&mut self, bookmarks: Vec<Bookmark>) {
        self.list.seed(bookmarks);
    }

    /// Seed from a snapshot and replay feed events it does not yet contain.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        let buffered = self.replay.take().unwrap_or_default();
        let head = snapshot.head;

        self.list.seed(snapshot.bookmarks);
        self.seeded_head = head;

        let mut replayed = 0usize;
        for (_, event) in buffered.iter().filter(|(seq, _)| *seq > head) {
            self.list.apply(event);
            replayed += 1;
        }

        tracing::debug!(
            owner = %self.owner_id,
            head,
            count = self.list.len(),
            replayed,
            "Loaded snapshot"
        );
    }

    /// Re-read the snapshot in the background.
    ///
    /// The result arrives as [`SyncEvent::SnapshotLoaded`]; an earlier
    /// in-flight read is cancelled.
    pub fn refresh(&mut self) {
        if let Some(handle) = self.snapshot_handle.take() {
            handle.abort();
        }
        self.snapshot_generation = self.snapshot_generation.wrapping_add(1);
        let generation = self.snapshot_generation;
        if self.replay.is_none() {
            self.replay = Some(Vec::new());
        }

        let db = self.db.clone();
        let owner_id = self.owner_id.clone();
        let tx = self.tx.clone();

        tracing::debug!(owner = %owner_id, generation, "Spawning snapshot read");

        // Panics are reported under the read's generation
        self.snapshot_handle = Some(tokio::spawn(async move {
            let result = match catch_task_panic(db.snapshot_for_owner(&owner_id)).await {
                Ok(Ok(snapshot)) => Ok(snapshot),
                Ok(Err(e)) => Err(e.to_string()),
                Err(panic_msg) => {
                    tracing::error!(task = "snapshot", generation, error = %panic_msg, "Background task panicked");
                    Err("internal error".to_string())
                }
            };
            send_event(
                &tx,
                SyncEvent::SnapshotLoaded {
                    owner_id,
                    generation,
                    result,
                },
                "SnapshotLoaded",
            )
            .await;
        }));
    }

    pub fn is_refreshing(&self) -> bool {
        self.snapshot_handle.is_some()
    }

    // ========================================================================
    // Subscription Lifecycle
    // ========================================================================

    /// Register the change feed for `owner_id`.
    ///
    /// A no-op while a live registration for the same owner exists. For a
    /// different owner the old registration is released first and the list
    /// is cleared (the caller refreshes to load the new owner's bookmarks).
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Subscription` if the handshake fails; the sync
    /// state becomes `Degraded` and the current list stays usable.
    pub async fn subscribe(&mut self, owner_id: &str) -> Result<(), SyncError> {
        if let Some(sub) = &self.subscription {
            if sub.owner_id() == owner_id && !sub.is_finished() {
                return Ok(());
            }
        }

        if let Some(old) = self.subscription.take() {
            old.release();
        }

        if owner_id != self.owner_id {
            tracing::info!(from = %self.owner_id, to = %owner_id, "Switching owner");
            self.owner_id = owner_id.to_string();
            self.reset_owner_state();
        }

        self.next_subscription_id = self.next_subscription_id.wrapping_add(1);
        match subscribe_changes(
            &self.db,
            owner_id,
            self.next_subscription_id,
            self.poll_interval,
            self.tx.clone(),
        )
        .await
        {
            Ok(sub) => {
                self.subscription = Some(sub);
                self.sync_state = SyncState::Live;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(owner = %owner_id, error = %e, "Change feed subscription failed");
                self.sync_state = SyncState::Degraded;
                Err(e)
            }
        }
    }

    /// Release the change feed registration (sign out).
    pub fn unsubscribe(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.release();
        }
        self.sync_state = SyncState::Idle;
    }

    /// True when the feed is degraded with no poller left to recover it:
    /// the handshake failed, or the poller stopped.
    pub fn needs_resubscribe(&self) -> bool {
        self.sync_state == SyncState::Degraded
            && self.subscription.as_ref().map_or(true, FeedSubscription::is_finished)
    }

    /// Retry the handshake for the current owner, then refresh so changes
    /// made while the feed was down are picked up.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Subscription` if the handshake fails again; the
    /// state stays `Degraded`.
    pub async fn resubscribe(&mut self) -> Result<(), SyncError> {
        let owner_id = self.owner_id.clone();
        self.subscribe(&owner_id).await?;
        tracing::info!(owner = %owner_id, "Change feed resubscribed");
        self.refresh();
        Ok(())
    }

    fn reset_owner_state(&mut self) {
        self.list.clear();
        self.copy_mark = CopyMark::default();
        self.deleting.clear();
        self.seeded_head = 0;
        self.replay = None;
        if let Some(handle) = self.snapshot_handle.take() {
            handle.abort();
        }
        self.snapshot_generation = self.snapshot_generation.wrapping_add(1);
    }

    fn is_current_subscription(&self, subscription: u64) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|sub| sub.id() == subscription)
    }

    // ========================================================================
    // Feed Events
    // ========================================================================

    /// Apply one feed event to the list. Returns true if the list changed.
    pub fn apply(&mut self, event: &FeedEvent) -> bool {
        self.list.apply(event)
    }

    /// Process one event from a background task.
    ///
    /// Returns a notice when the outcome should be shown to the user.
    pub fn handle_event(&mut self, event: SyncEvent) -> Option<Notice> {
        match event {
            SyncEvent::Feed {
                subscription,
                seq,
                event,
            } => {
                if !self.is_current_subscription(subscription) {
                    tracing::debug!(subscription, seq, "Dropping event from released subscription");
                    return None;
                }
                if seq <= self.seeded_head {
                    return None;
                }
                if let FeedEvent::Delete(id) = &event {
                    self.deleting.remove(id);
                }
                self.apply(&event);
                if let Some(buffer) = self.replay.as_mut() {
                    buffer.push((seq, event));
                }
                None
            }
            SyncEvent::FeedDegraded {
                subscription,
                error,
            } => {
                if !self.is_current_subscription(subscription) {
                    return None;
                }
                self.sync_state = SyncState::Degraded;
                Some(Notice::Error(SyncError::Subscription(error)))
            }
            SyncEvent::FeedRecovered { subscription } => {
                if !self.is_current_subscription(subscription) {
                    return None;
                }
                self.sync_state = SyncState::Live;
                Some(Notice::Info(Cow::Borrowed("Live sync restored")))
            }
            SyncEvent::SnapshotLoaded {
                owner_id,
                generation,
                result,
            } => {
                if generation != self.snapshot_generation || owner_id != self.owner_id {
                    tracing::debug!(generation, current = self.snapshot_generation, "Ignoring stale snapshot");
                    return None;
                }
                self.snapshot_handle = None;
                match result {
                    Ok(snapshot) => {
                        self.load_snapshot(snapshot);
                        None
                    }
                    Err(error) => {
                        self.replay = None;
                        tracing::error!(error = %error, "Snapshot read failed");
                        Some(Notice::Error(SyncError::Store(format!(
                            "Refresh failed: {}",
                            error
                        ))))
                    }
                }
            }
            SyncEvent::BookmarkCreated { bookmark } => {
                self.pending_creates = self.pending_creates.saturating_sub(1);
                tracing::info!(id = bookmark.id, "Bookmark created");
                self.refresh();
                Some(Notice::Info(Cow::Owned(format!(
                    "Saved \"{}\"",
                    bookmark.title
                ))))
            }
            SyncEvent::CreateFailed { error } => {
                self.pending_creates = self.pending_creates.saturating_sub(1);
                Some(Notice::Error(SyncError::Store(format!(
                    "Could not save bookmark: {}",
                    error
                ))))
            }
            SyncEvent::BookmarkDeleted { id, removed } => {
                self.deleting.remove(&id);
                tracing::info!(id, removed, "Bookmark delete confirmed");
                Some(Notice::Info(Cow::Borrowed("Bookmark deleted")))
            }
            SyncEvent::DeleteFailed { id, error } => {
                self.deleting.remove(&id);
                Some(Notice::Error(SyncError::Store(format!(
                    "Could not delete bookmark: {}",
                    error
                ))))
            }
        }
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Validate and submit a new bookmark for the current owner.
    ///
    /// Nothing is inserted into the list here; the row appears once the
    /// store reports it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for an empty title or a URL that is
    /// not an absolute http(s) URL. No request is made in that case.
    pub fn add_bookmark(&mut self, title: &str, url: &str) -> Result<(), SyncError> {
        let (title, url) = validate_new_bookmark(title, url)?;

        self.pending_creates += 1;
        let db = self.db.clone();
        let owner_id = self.owner_id.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let outcome = catch_task_panic(db.insert_bookmark(&owner_id, &title, &url)).await;
            let event = match outcome {
                Ok(Ok(bookmark)) => SyncEvent::BookmarkCreated { bookmark },
                Ok(Err(e)) => {
                    tracing::error!(error = %e, owner = %owner_id, "Failed to create bookmark");
                    SyncEvent::CreateFailed {
                        error: e.to_string(),
                    }
                }
                Err(panic_msg) => {
                    tracing::error!(task = "create_bookmark", error = %panic_msg, "Background task panicked");
                    SyncEvent::CreateFailed {
                        error: "internal error".to_string(),
                    }
                }
            };
            send_event(&tx, event, "BookmarkCreated").await;
        });

        Ok(())
    }

    /// Submit a delete for a confirmed bookmark.
    ///
    /// The entry stays visible until the feed reports the delete. Returns
    /// false if a delete for this id is already in flight.
    pub fn delete_bookmark(&mut self, id: i64) -> bool {
        if !self.deleting.insert(id) {
            return false;
        }

        let db = self.db.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let outcome = catch_task_panic(db.delete_bookmark(id)).await;
            let event = match outcome {
                Ok(Ok(removed)) => SyncEvent::BookmarkDeleted { id, removed },
                Ok(Err(e)) => {
                    tracing::error!(error = %e, id, "Failed to delete bookmark");
                    SyncEvent::DeleteFailed {
                        id,
                        error: e.to_string(),
                    }
                }
                Err(panic_msg) => {
                    tracing::error!(task = "delete_bookmark", id, error = %panic_msg, "Background task panicked");
                    SyncEvent::DeleteFailed {
                        id,
                        error: "internal error".to_string(),
                    }
                }
            };
            send_event(&tx, event, "BookmarkDeleted").await;
        });

        true
    }

    /// Copy `url` to the clipboard and mark `id` as copied.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Clipboard` if the write fails; the mark is left
    /// unchanged.
    pub fn copy(&mut self, url: &str, id: i64) -> Result<(), SyncError> {
        self.clipboard
            .set_text(url)
            .map_err(|e| SyncError::Clipboard(e.to_string()))?;
        self.copy_mark.mark(id);
        Ok(())
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter.set(text);
    }

    /// Expire the copy mark. Returns true if the display changed.
    pub fn tick(&mut self) -> bool {
        self.copy_mark.clear_expired()
    }

    // ========================================================================
    // Derived State
    // ========================================================================

    pub fn visible(&self) -> Vec<&Bookmark> {
        self.filter.visible(self.list.as_slice())
    }

    pub fn classification(&self) -> Classification {
        Classification::classify(self.list.len(), self.visible().len())
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.list.as_slice()
    }

    pub fn get(&self, id: i64) -> Option<&Bookmark> {
        self.list.get(id)
    }

    pub fn total(&self) -> usize {
        self.list.len()
    }

    pub fn filter_text(&self) -> &str {
        self.filter.raw()
    }

    pub fn is_copied(&self, id: i64) -> bool {
        self.copy_mark.is_marked(id)
    }

    pub fn copied_id(&self) -> Option<i64> {
        self.copy_mark.marked()
    }

    pub fn is_saving(&self) -> bool {
        self.pending_creates > 0
    }

    pub fn is_deleting(&self, id: i64) -> bool {
        self.deleting.contains(&id)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Drop for BookmarkViewModel {
    fn drop(&mut self) {
        if let Some(handle) = self.snapshot_handle.take() {
            handle.abort();
            tracing::debug!("Aborted snapshot read on view model drop");
        }
    }
}
