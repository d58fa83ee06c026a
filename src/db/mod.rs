//! Database layer for skinia-client
//!
//! Handles SQLite persistence for the local key-value settings and the
//! per-credential result history.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`settings`]: Well-known key/value settings (API key, API URL)
//! - [`history`]: Bounded per-owner result history

use crate::types::{HistoryEntry, RequestId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod history;
mod migrations;
mod settings;

pub use settings::keys;

/// History record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Insertion sequence; higher is newer
    pub id: i64,
    /// Fingerprint of the owning credential
    pub owner_key: String,
    /// Job identifier
    pub request_id: String,
    /// Most likely condition
    pub label: String,
    /// Probability of `label`
    pub confidence: f64,
    /// Completion time in Unix milliseconds
    pub timestamp: i64,
    /// `data:` URL of the analysed image
    pub image_preview: Option<String>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            request_id: RequestId::new(row.request_id),
            label: row.label,
            confidence: row.confidence,
            timestamp: DateTime::<Utc>::from_timestamp_millis(row.timestamp).unwrap_or_default(),
            image_preview: row.image_preview,
            owner_key: row.owner_key,
        }
    }
}

/// Database handle for skinia-client
pub struct Database {
    pool: SqlitePool,
}
