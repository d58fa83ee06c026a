//! Backend health and the distributed system dashboard.

use crate::error::Result;
use crate::types::{ClusterStatus, ElectionTriggered};

use super::SkinIaClient;

impl SkinIaClient {
    /// Check that the backend is up
    pub async fn health_check(&self) -> Result<()> {
        Ok(self.transport().await?.health_check().await?)
    }

    /// Cluster status; [`ClusterStatus::Disabled`] when the backend runs standalone
    pub async fn distributed_status(&self) -> Result<ClusterStatus> {
        let (transport, _) = self.authed_transport().await?;
        Ok(transport.distributed_status().await?)
    }

    /// Ask the backend to start a leader election
    pub async fn trigger_election(&self) -> Result<ElectionTriggered> {
        let (transport, _) = self.authed_transport().await?;
        let triggered = transport.trigger_election().await?;
        tracing::info!(node_id = ?triggered.node_id, "leader election triggered");
        Ok(triggered)
    }

    /// Hardware the backend's model runs on
    pub async fn hardware_info(&self) -> Result<serde_json::Value> {
        let (transport, _) = self.authed_transport().await?;
        Ok(transport.hardware_info().await?)
    }

    /// Run the backend's distributed mutual exclusion demo
    pub async fn critical_section_demo(&self) -> Result<serde_json::Value> {
        let (transport, _) = self.authed_transport().await?;
        Ok(transport.critical_section_demo().await?)
    }
}
