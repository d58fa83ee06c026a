//! Per-credential result history.
//!
//! Entries are partitioned by owner fingerprint. Each append trims only the
//! acting owner's partition to the configured limit; other owners' entries
//! are never touched, and there is no cap across owners.

use crate::Result;
use crate::db::Database;
use crate::types::HistoryEntry;
use std::sync::Arc;

/// Durable, bounded result log keyed by owner
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Database>,
    per_owner_limit: usize,
}

impl HistoryStore {
    /// Create a store that keeps at most `per_owner_limit` entries per owner
    pub fn new(db: Arc<Database>, per_owner_limit: usize) -> Self {
        Self {
            db,
            per_owner_limit: per_owner_limit.max(1),
        }
    }

    /// Record an entry as the newest for its owner
    pub async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let trimmed = self.db.append_history(entry, self.per_owner_limit).await?;
        tracing::info!(
            request_id = %entry.request_id,
            label = %entry.label,
            trimmed,
            "history entry recorded"
        );
        Ok(())
    }

    /// An owner's entries, most recent first (empty if none)
    pub async fn list_for(&self, owner_key: &str) -> Result<Vec<HistoryEntry>> {
        self.db.list_history(owner_key).await
    }

    /// Remove all of an owner's entries
    pub async fn clear_for(&self, owner_key: &str) -> Result<u64> {
        self.db.clear_history(owner_key).await
    }

    /// Retention limit per owner
    pub fn per_owner_limit(&self) -> usize {
        self.per_owner_limit
    }
}
