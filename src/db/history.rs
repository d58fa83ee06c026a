//! History management operations.

use crate::types::HistoryEntry;
use crate::{Error, Result};

use super::{Database, HistoryRow};

impl Database {
    /// Append a history entry and trim its owner's partition
    ///
    /// The insert and the trim run in one transaction, so concurrent appends
    /// never observe or leave a partially trimmed partition. Only rows owned by
    /// `entry.owner_key` are ever deleted.
    ///
    /// Returns the number of older entries removed by the trim.
    pub async fn append_history(&self, entry: &HistoryEntry, per_owner_limit: usize) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO history (
                owner_key, request_id, label, confidence, timestamp, image_preview
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.owner_key)
        .bind(entry.request_id.as_str())
        .bind(&entry.label)
        .bind(entry.confidence)
        .bind(entry.timestamp.timestamp_millis())
        .bind(&entry.image_preview)
        .execute(&mut *tx)
        .await
        .map_err(Error::Sqlx)?;

        let trimmed = sqlx::query(
            r#"
            DELETE FROM history
            WHERE owner_key = ?
              AND id NOT IN (
                  SELECT id FROM history
                  WHERE owner_key = ?
                  ORDER BY id DESC
                  LIMIT ?
              )
            "#,
        )
        .bind(&entry.owner_key)
        .bind(&entry.owner_key)
        .bind(per_owner_limit as i64)
        .execute(&mut *tx)
        .await
        .map_err(Error::Sqlx)?;

        tx.commit().await.map_err(Error::Sqlx)?;

        Ok(trimmed.rows_affected())
    }

    /// List an owner's history, most recent first
    pub async fn list_history(&self, owner_key: &str) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, owner_key, request_id, label, confidence, timestamp, image_preview
            FROM history
            WHERE owner_key = ?
            ORDER BY id DESC
            "#,
        )
        .bind(owner_key)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Count an owner's history entries
    pub async fn count_history(&self, owner_key: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM history WHERE owner_key = ?")
            .bind(owner_key)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)
    }

    /// Delete every entry of one owner
    ///
    /// Returns the number of records deleted.
    pub async fn clear_history(&self, owner_key: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history WHERE owner_key = ?")
            .bind(owner_key)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }
}
