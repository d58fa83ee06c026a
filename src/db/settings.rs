//! Key/value settings: the stored API key and API base URL.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

/// Well-known setting keys
pub mod keys {
    /// The active API key
    pub const API_KEY: &str = "skinia_api_key";
    /// The user-chosen API base URL
    pub const API_URL: &str = "skinia_api_url";
}

impl Database {
    /// Read a setting, `None` if it was never written or was deleted
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read setting '{}': {}",
                    key, e
                )))
            })
    }

    /// Insert or overwrite a setting
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write setting '{}': {}",
                key, e
            )))
        })?;

        Ok(())
    }

    /// Remove a setting
    ///
    /// Returns true if a value was present.
    pub async fn delete_setting(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete setting '{}': {}",
                    key, e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
