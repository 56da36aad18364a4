use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

/// Change-log rows older than this are pruned when the database is opened.
const CHANGE_LOG_RETENTION_SECS: i64 = 7 * 24 * 60 * 60;

// ============================================================================
// Database
// ============================================================================

/// Handle to the bookmark store.
///
/// Cloning is cheap (the pool is reference counted); every session and
/// background task holds its own clone.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `path` may be `":memory:"` for an isolated in-process database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process keeps the database
    /// locked past the busy timeout, `DatabaseError::Migration` if the schema
    /// could not be applied, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Restrict the file to the current user before the pool touches it
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::OpenOptionsExt;
            let db_path = std::path::Path::new(path);
            if !db_path.exists() {
                // If creation fails, SQLite will report the error at connect_with.
                let _ = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path);
            }
        }

        // busy_timeout: several sessions share one file, so writers wait for
        // each other instead of failing with SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .pragma("journal_mode", "WAL");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;

        match db.prune_change_log(CHANGE_LOG_RETENTION_SECS).await {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(pruned, "Pruned old change-log entries"),
            Err(e) => tracing::warn!(error = %e, "Failed to prune change log"),
        }

        Ok(db)
    }

    /// Close the pool. Pending and future queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// True once [`Database::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    pub(crate) async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmarks (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL CHECK (length(trim(title)) > 0),
                url TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Snapshot query: WHERE user_id = ? ORDER BY created_at DESC, id DESC
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookmarks_user_created ON bookmarks(user_id, created_at DESC, id DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // Change log tailed by every open session. `seq` is the store's
        // write order; AUTOINCREMENT keeps it monotonic even after pruning.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmark_changes (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL CHECK (kind IN ('insert', 'update', 'delete')),
                bookmark_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                changed_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_bookmark_changes_user_seq ON bookmark_changes(user_id, seq)",
        )
        .execute(&mut *tx)
        .await?;

        // Triggers run inside the writer's transaction, so a committed write
        // and its change-log row are always visible together.
        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS bookmarks_change_insert AFTER INSERT ON bookmarks BEGIN
                INSERT INTO bookmark_changes (kind, bookmark_id, user_id, title, url, created_at, changed_at)
                VALUES ('insert', new.id, new.user_id, new.title, new.url, new.created_at, CAST(strftime('%s', 'now') AS INTEGER));
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS bookmarks_change_update AFTER UPDATE ON bookmarks BEGIN
                INSERT INTO bookmark_changes (kind, bookmark_id, user_id, title, url, created_at, changed_at)
                VALUES ('update', new.id, new.user_id, new.title, new.url, new.created_at, CAST(strftime('%s', 'now') AS INTEGER));
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS bookmarks_change_delete AFTER DELETE ON bookmarks BEGIN
                INSERT INTO bookmark_changes (kind, bookmark_id, user_id, title, url, created_at, changed_at)
                VALUES ('delete', old.id, old.user_id, old.title, old.url, old.created_at, CAST(strftime('%s', 'now') AS INTEGER));
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
