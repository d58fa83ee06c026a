//! API URL configuration.

use crate::config::normalize_base_url;
use crate::db::keys;
use crate::error::Result;

use super::SkinIaClient;

impl SkinIaClient {
    /// Validate, persist and activate a new API base URL
    ///
    /// Returns the normalized URL (trimmed, without trailing slash).
    pub async fn set_api_url(&self, url: &str) -> Result<String> {
        let normalized = normalize_base_url(url)?;
        self.db.set_setting(keys::API_URL, &normalized).await?;
        self.session.write().await.api_url = Some(normalized.clone());
        tracing::info!(api_url = %normalized, "API URL updated");
        Ok(normalized)
    }

    /// The active API base URL, if one is configured
    pub async fn api_url(&self) -> Option<String> {
        self.session.read().await.api_url.clone()
    }
}
