//! Change log read side.
//!
//! Every write to `bookmarks` appends a row to `bookmark_changes` via
//! triggers (see `schema.rs`). Sessions remember the highest `seq` they have
//! seen and read forward from it, filtered to their owner.

use anyhow::Result;
use std::sync::Arc;

use super::schema::Database;
use super::types::{Bookmark, DatabaseError};

/// Maximum change-log rows returned per read.
pub const CHANGE_BATCH_SIZE: i64 = 200;

/// Kind of write recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One committed write, as recorded by the store.
///
/// For inserts and updates `record` is the row after the write; for deletes
/// it is the row as it was before removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange {
    pub seq: i64,
    pub kind: ChangeKind,
    pub record: Bookmark,
}

#[derive(Debug, sqlx::FromRow)]
struct ChangeDbRow {
    seq: i64,
    kind: String,
    bookmark_id: i64,
    user_id: String,
    title: String,
    url: String,
    created_at: i64,
}

impl ChangeDbRow {
    fn into_change(self) -> Option<RowChange> {
        let Some(kind) = ChangeKind::parse(&self.kind) else {
            tracing::warn!(seq = self.seq, kind = %self.kind, "Unknown change kind, skipping");
            return None;
        };
        Some(RowChange {
            seq: self.seq,
            kind,
            record: Bookmark {
                id: self.bookmark_id,
                owner_id: self.user_id,
                title: Arc::from(self.title),
                url: Arc::from(self.url),
                created_at: self.created_at,
            },
        })
    }
}

impl Database {
    // ========================================================================
    // Change Log Operations
    // ========================================================================

    /// Current head of the change log (0 when empty).
    ///
    /// A new subscription starts reading after this position.
    pub async fn change_log_head(&self) -> Result<i64, DatabaseError> {
        if self.is_closed() {
            return Err(DatabaseError::Closed);
        }
        let (head,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(seq), 0) FROM bookmark_changes")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(head)
    }

    /// Read up to [`CHANGE_BATCH_SIZE`] changes for `owner_id` with `seq > after`,
    /// in write order.
    pub async fn changes_since(&self, owner_id: &str, after: i64) -> Result<Vec<RowChange>, DatabaseError> {
        let rows = sqlx::query_as::<_, ChangeDbRow>(
            r#"
            SELECT seq, kind, bookmark_id, user_id, title, url, created_at
            FROM bookmark_changes
            WHERE user_id = ? AND seq > ?
            ORDER BY seq
            LIMIT ?
        "#,
        )
        .bind(owner_id)
        .bind(after)
        .bind(CHANGE_BATCH_SIZE)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(rows.into_iter().filter_map(ChangeDbRow::into_change).collect())
    }

    /// Delete change-log rows older than `max_age_secs`. Returns rows removed.
    pub async fn prune_change_log(&self, max_age_secs: i64) -> Result<u64> {
        let cutoff = chrono::Utc::now().timestamp() - max_age_secs;
        let result = sqlx::query("DELETE FROM bookmark_changes WHERE changed_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_log_head_is_zero() {
        let db = test_db().await;
        assert_eq!(db.change_log_head().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_are_logged_in_order() {
        let db = test_db().await;

        let bm = db
            .insert_bookmark("u", "T", "https://t.example.com")
            .await
            .unwrap();
        db.update_bookmark(bm.id, "T2", "https://t.example.com")
            .await
            .unwrap();
        db.delete_bookmark(bm.id).await.unwrap();

        let changes = db.changes_since("u", 0).await.unwrap();
        let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
        assert!(changes.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(&*changes[1].record.title, "T2");
        assert_eq!(changes[2].record.id, bm.id);
    }

    #[tokio::test]
    async fn test_changes_filtered_by_owner_and_cursor() {
        let db = test_db().await;

        db.insert_bookmark("alice", "A1", "https://a1.example.com")
            .await
            .unwrap();
        let head = db.change_log_head().await.unwrap();
        db.insert_bookmark("bob", "B1", "https://b1.example.com")
            .await
            .unwrap();
        db.insert_bookmark("alice", "A2", "https://a2.example.com")
            .await
            .unwrap();

        let changes = db.changes_since("alice", head).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(&*changes[0].record.title, "A2");
    }

    #[tokio::test]
    async fn test_delete_of_absent_row_logs_nothing() {
        let db = test_db().await;
        db.delete_bookmark(42).await.unwrap();
        assert_eq!(db.change_log_head().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_keeps_recent_entries() {
        let db = test_db().await;
        db.insert_bookmark("u", "T", "https://t.example.com")
            .await
            .unwrap();

        let pruned = db.prune_change_log(3600).await.unwrap();
        assert_eq!(pruned, 0);
        assert_eq!(db.changes_since("u", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_head_on_closed_database() {
        let db = test_db().await;
        db.close().await;
        assert!(matches!(
            db.change_log_head().await,
            Err(DatabaseError::Closed)
        ));
    }
}
