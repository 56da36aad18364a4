use anyhow::Result;

use super::schema::Database;
use super::types::{Bookmark, BookmarkDbRow, Snapshot};

impl Database {
    // ========================================================================
    // Bookmark Operations
    // ========================================================================

    /// Snapshot read: all bookmarks of one owner, newest first.
    ///
    /// Ties on `created_at` (same second) are broken by id so the order is
    /// stable across refreshes.
    pub async fn get_bookmarks_for_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>> {
        let rows = sqlx::query_as::<_, BookmarkDbRow>(
            r#"
            SELECT id, user_id, title, url, created_at
            FROM bookmarks
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BookmarkDbRow::into_bookmark).collect())
    }

    /// Snapshot read paired with the change-log head it reflects.
    ///
    /// Both reads run in one transaction, so every change with `seq <= head`
    /// is contained in `bookmarks` and every later change is not.
    pub async fn snapshot_for_owner(&self, owner_id: &str) -> Result<Snapshot> {
        let mut tx = self.pool.begin().await?;

        let (head,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(seq), 0) FROM bookmark_changes")
            .fetch_one(&mut *tx)
            .await?;

        let rows = sqlx::query_as::<_, BookmarkDbRow>(
            r#"
            SELECT id, user_id, title, url, created_at
            FROM bookmarks
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
        "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Snapshot {
            bookmarks: rows.into_iter().map(BookmarkDbRow::into_bookmark).collect(),
            head,
        })
    }

    /// Get a single bookmark by id
    pub async fn get_bookmark(&self, id: i64) -> Result<Option<Bookmark>> {
        let row = sqlx::query_as::<_, BookmarkDbRow>(
            "SELECT id, user_id, title, url, created_at FROM bookmarks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BookmarkDbRow::into_bookmark))
    }

    /// Insert a bookmark and return the stored row (with its assigned id and
    /// creation timestamp).
    ///
    /// Callers validate title and url first; the table only enforces a
    /// non-blank title.
    pub async fn insert_bookmark(&self, owner_id: &str, title: &str, url: &str) -> Result<Bookmark> {
        let now = chrono::Utc::now().timestamp();
        let row = sqlx::query_as::<_, BookmarkDbRow>(
            r#"
            INSERT INTO bookmarks (user_id, title, url, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, user_id, title, url, created_at
        "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = row.id, owner = %owner_id, "Inserted bookmark");
        Ok(row.into_bookmark())
    }

    /// Edit title and url of an existing bookmark.
    ///
    /// Returns the updated row, or `None` if no bookmark has this id.
    pub async fn update_bookmark(&self, id: i64, title: &str, url: &str) -> Result<Option<Bookmark>> {
        let row = sqlx::query_as::<_, BookmarkDbRow>(
            r#"
            UPDATE bookmarks SET title = ?, url = ?
            WHERE id = ?
            RETURNING id, user_id, title, url, created_at
        "#,
        )
        .bind(title)
        .bind(url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BookmarkDbRow::into_bookmark))
    }

    /// Delete a bookmark by id.
    ///
    /// Returns `true` if a row was removed. Deleting an absent id succeeds
    /// with `false`; the caller treats both as success.
    pub async fn delete_bookmark(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        tracing::debug!(id, removed, "Deleted bookmark");
        Ok(removed)
    }

    /// Count bookmarks of one owner
    pub async fn count_bookmarks(&self, owner_id: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookmarks WHERE user_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
