//! Image analysis and result history.

use crate::error::{Error, Result};
use crate::orchestrator::{AnalysisHandle, UploadOrchestrator};
use crate::transport::Transport;
use crate::types::{HistoryEntry, ImageUpload, Job, JobStatus, RequestId};
use std::path::Path;
use std::sync::Arc;

use super::SkinIaClient;

impl SkinIaClient {
    /// Orchestrator bound to the active credential and its history partition
    pub async fn orchestrator(&self) -> Result<UploadOrchestrator> {
        let (transport, credential) = self.authed_transport().await?;
        Ok(UploadOrchestrator::new(
            Arc::new(transport),
            self.config.polling.clone(),
            self.config.upload.clone(),
            self.config.api.variant,
        )
        .with_history(self.history.clone(), credential.owner_key()))
    }

    /// Start analysing an image
    ///
    /// The image is validated locally before anything is sent. Successful
    /// results are added to the active credential's history.
    pub async fn analyze(&self, upload: ImageUpload) -> Result<AnalysisHandle> {
        Ok(self.orchestrator().await?.start(upload))
    }

    /// Start analysing an image file, taking its MIME type from the extension
    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisHandle> {
        let upload = ImageUpload::from_path(path).await?;
        self.analyze(upload).await
    }

    /// The active credential's history, most recent first
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let owner_key = self.owner_key().await?;
        self.history.list_for(&owner_key).await
    }

    /// Delete the active credential's history; returns the number of entries removed
    pub async fn clear_history(&self) -> Result<u64> {
        let owner_key = self.owner_key().await?;
        self.history.clear_for(&owner_key).await
    }

    /// Fetch the full server-side result of a past analysis
    ///
    /// Returns `None` when the job exists but has not completed.
    pub async fn view_history_item(&self, request_id: &RequestId) -> Result<Option<Job>> {
        let (transport, _) = self.authed_transport().await?;
        let job = transport.poll_once(request_id).await?;
        Ok((job.status == JobStatus::Completed).then_some(job))
    }

    async fn owner_key(&self) -> Result<String> {
        self.session
            .read()
            .await
            .owner_key()
            .ok_or(Error::NotAuthenticated)
    }
}
