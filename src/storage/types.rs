use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a write lock that outlived the busy timeout
    #[error("The bookmark database is locked by another process. Please try again.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// The pool was closed (session shutting down)
    #[error("Database connection is closed")]
    Closed,

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping SQLite lock conditions to [`DatabaseError::Locked`].
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::PoolClosed) {
            return DatabaseError::Closed;
        }
        if is_lock_message(&err.to_string()) {
            return DatabaseError::Locked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6) surface only as message text through sqlx.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("sqlite_locked")
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for bookmark queries (used by sqlx FromRow).
/// Converts to [`Bookmark`] via `into_bookmark()` with Arc wrapping.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookmarkDbRow {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub created_at: i64,
}

impl BookmarkDbRow {
    pub(crate) fn into_bookmark(self) -> Bookmark {
        Bookmark {
            id: self.id,
            owner_id: self.user_id,
            title: Arc::from(self.title),
            url: Arc::from(self.url),
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A bookmark row as stored and as delivered by the change feed.
///
/// `title` and `url` use `Arc<str>` because the same record is cloned into the
/// view list, render passes, and clipboard/open intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Server-assigned identifier, unique across all owners.
    pub id: i64,
    pub owner_id: String,
    pub title: Arc<str>,
    pub url: Arc<str>,
    /// Unix seconds, assigned by the store on insert.
    pub created_at: i64,
}

/// Point-in-time read of one owner's bookmarks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Newest first.
    pub bookmarks: Vec<Bookmark>,
    /// Change-log position the read reflects.
    pub head: i64,
}
