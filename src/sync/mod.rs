//! Live bookmark synchronization.
//!
//! [`BookmarkViewModel`] owns the session's bookmark list and keeps it in
//! step with the store: it is seeded from a snapshot, follows the change
//! feed, and turns user intents (add, delete, copy, search) into store calls
//! whose outcomes come back as [`SyncEvent`]s on the session's channel.

mod copy_mark;
mod error;
mod events;
mod filter;
mod list;
mod subscription;
mod task;
mod view_model;

pub use copy_mark::{CopyMark, COPY_MARK_DURATION};
pub use error::{SyncError, ValidationError};
pub use events::{FeedEvent, SyncEvent};
pub use filter::{Classification, SearchFilter};
pub use list::BookmarkList;
pub use subscription::{subscribe_changes, FeedSubscription};
pub use view_model::{validate_new_bookmark, BookmarkViewModel, Notice, SyncState};
