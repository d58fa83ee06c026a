//! Core types for skinia-client

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Server-assigned identifier of one analysis job
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Create a new RequestId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, as shown in result summaries
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Whether the server left the identifier blank
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which classification endpoint a submission goes to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// `POST /v1/analyze-pytorch`
    #[default]
    Pytorch,
    /// `POST /v1/analyze`
    Tensorflow,
}

impl ModelVariant {
    /// Path of the submit endpoint for this variant
    pub fn endpoint(&self) -> &'static str {
        match self {
            ModelVariant::Pytorch => "/v1/analyze-pytorch",
            ModelVariant::Tensorflow => "/v1/analyze",
        }
    }
}

/// Server-reported job status
///
/// Anything the server sends besides `completed` and `failed` counts as in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker
    Queued,
    /// A worker is running the model
    Processing,
    /// Result is available
    Completed,
    /// The analysis failed on the server
    Failed,
    /// Any status this client does not know
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether no further transition can occur
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One ranked prediction from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Condition label
    pub label: String,
    /// Probability in 0.0..=1.0
    pub confidence: f64,
}

/// Model metadata attached to a result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Framework that served the prediction (e.g., "PyTorch")
    #[serde(default)]
    pub framework: Option<String>,
    /// Any other model fields the server includes
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Optional extras attached to a result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultExtra {
    /// Model metadata
    #[serde(default)]
    pub model: Option<ModelInfo>,
    /// Ranked predictions, best first
    #[serde(default)]
    pub top_k: Option<Vec<Prediction>>,
    /// Any other fields the server includes
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Classification payload of a completed job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Most likely condition
    pub label: String,
    /// Probability of `label` in 0.0..=1.0
    pub confidence: f64,
    /// Completion time as reported by the server
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Top-k predictions and model metadata
    #[serde(default)]
    pub extra: Option<ResultExtra>,
}

impl ResultPayload {
    /// Up to five best predictions
    pub fn top_predictions(&self) -> &[Prediction] {
        let all = self
            .extra
            .as_ref()
            .and_then(|e| e.top_k.as_deref())
            .unwrap_or(&[]);
        &all[..all.len().min(5)]
    }

    /// Framework name, defaulting to PyTorch when the server does not say
    pub fn framework(&self) -> &str {
        self.extra
            .as_ref()
            .and_then(|e| e.model.as_ref())
            .and_then(|m| m.framework.as_deref())
            .unwrap_or("PyTorch")
    }

    /// Parsed completion time, if the server sent a readable one
    pub fn completed_at_utc(&self) -> Option<DateTime<Utc>> {
        self.completed_at.as_deref().and_then(parse_timestamp)
    }
}

/// Current state of one analysis job, as returned by `GET /v1/status/{id}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier (filled from the polled id when the body omits it)
    #[serde(default = "empty_request_id")]
    pub request_id: RequestId,
    /// Server-reported status
    pub status: JobStatus,
    /// Present once the job completed
    #[serde(default)]
    pub result: Option<ResultPayload>,
    /// Present when the job failed
    #[serde(default)]
    pub error_message: Option<String>,
}

fn empty_request_id() -> RequestId {
    RequestId::new(String::new())
}

/// Acknowledgement of a successful submit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Identifier to poll
    pub request_id: RequestId,
    /// Initial status, when the server reports one
    #[serde(default)]
    pub status: Option<JobStatus>,
    /// Cluster node the job was routed to
    #[serde(default)]
    pub assigned_to_node: Option<serde_json::Value>,
}

impl SubmitReceipt {
    /// Node label for display ("local" when unassigned)
    pub fn node_label(&self) -> String {
        match &self.assigned_to_node {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "local".to_string(),
        }
    }
}

/// An image selected for analysis
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// File name sent in the multipart form
    pub file_name: String,
    /// MIME type (e.g., "image/png")
    pub content_type: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload from in-memory content
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an image from disk, guessing the MIME type from its extension
    pub async fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };
        Ok(Self {
            file_name,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `data:` URL of the image, used as the history preview
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            BASE64.encode(&self.bytes)
        )
    }
}

/// Final outcome of a successful analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Job identifier
    pub request_id: RequestId,
    /// Most likely condition
    pub label: String,
    /// Probability of `label`
    pub confidence: f64,
    /// When the server finished (falls back to the time the result arrived)
    pub completed_at: DateTime<Utc>,
    /// The terminal job as returned by the server
    pub raw: Job,
}

impl AnalysisResult {
    /// Build a result from a completed job
    ///
    /// Returns `None` if the job carries no result payload.
    pub fn from_job(job: Job) -> Option<Self> {
        let payload = job.result.as_ref()?;
        Some(Self {
            request_id: job.request_id.clone(),
            label: payload.label.clone(),
            confidence: payload.confidence,
            completed_at: payload.completed_at_utc().unwrap_or_else(Utc::now),
            raw: job,
        })
    }
}

/// Progress events emitted while an analysis runs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Progress {
    /// The image is being sent
    Uploading {
        /// File name
        file_name: String,
        /// Size in bytes
        size_bytes: u64,
    },

    /// The server accepted the image and assigned an id
    Submitted {
        /// Identifier to poll
        request_id: RequestId,
        /// Node the job was routed to ("local" when unassigned)
        node: String,
    },

    /// A status check succeeded but the job is still running
    Polling {
        /// Job being polled
        request_id: RequestId,
        /// Attempt number (1-based)
        attempt: u32,
        /// Time spent polling so far (`attempt * interval`)
        #[serde(with = "duration_secs")]
        elapsed: Duration,
        /// Last reported status
        status: JobStatus,
    },

    /// The analysis finished with a result
    Completed {
        /// The result
        result: Box<AnalysisResult>,
    },

    /// The analysis ended without a result
    Failed {
        /// Job identifier, if the submit got that far
        request_id: Option<RequestId>,
        /// Display message
        error: String,
    },

    /// The caller cancelled the analysis
    Cancelled {
        /// Job identifier, if the submit got that far
        request_id: Option<RequestId>,
    },
}

impl Progress {
    /// Whether this is the last event of an analysis
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Progress::Completed { .. } | Progress::Failed { .. } | Progress::Cancelled { .. }
        )
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// A persisted history record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Job identifier
    pub request_id: RequestId,
    /// Most likely condition
    pub label: String,
    /// Probability of `label` (0.0 to 1.0)
    pub confidence: f64,
    /// When the analysis completed
    pub timestamp: DateTime<Utc>,
    /// `data:` URL of the analysed image
    pub image_preview: Option<String>,
    /// Fingerprint of the credential this entry belongs to
    pub owner_key: String,
}

impl HistoryEntry {
    /// Build a history record for a finished analysis
    pub fn from_result(
        result: &AnalysisResult,
        image_preview: Option<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            request_id: result.request_id.clone(),
            label: result.label.clone(),
            confidence: result.confidence,
            timestamp: result.completed_at,
            image_preview,
            owner_key: owner_key.into(),
        }
    }
}

/// Body of `POST /v1/register`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Display name (at least three characters)
    pub name: String,
    /// Contact address
    pub email: Option<String>,
}

/// Response of a successful registration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Registered name
    pub name: String,
    /// Newly issued API key; shown once
    pub api_key: String,
}

/// Health of one cluster node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    /// Reported state (e.g., "alive", "dead", "suspected")
    #[serde(default)]
    pub status: Option<String>,
    /// Last heartbeat time
    #[serde(default)]
    pub last_ping: Option<String>,
    /// Any other fields the server includes
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Snapshot of the backend's distributed system
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributedStatus {
    /// Node that served this request
    #[serde(default)]
    pub node_id: Option<u64>,
    /// Current leader
    #[serde(default)]
    pub leader_id: Option<u64>,
    /// Whether the serving node is the leader
    #[serde(default)]
    pub is_leader: bool,
    /// Nodes currently considered alive
    #[serde(default)]
    pub alive_nodes: Vec<u64>,
    /// Cluster size
    #[serde(default)]
    pub total_nodes: u64,
    /// Analyses processed by the cluster
    #[serde(default)]
    pub tasks_processed: u64,
    /// Per-node health, keyed by node id
    #[serde(default)]
    pub health_summary: Option<HashMap<String, NodeHealth>>,
    /// Per-node task counts, keyed by node id
    #[serde(default)]
    pub load_summary: Option<HashMap<String, u64>>,
    /// Lamport clock of the serving node
    #[serde(default)]
    pub lamport_clock: u64,
    /// Election state ("idle" when absent)
    #[serde(default)]
    pub election_state: Option<String>,
    /// Whether the serving node holds the distributed lock
    #[serde(default)]
    pub in_critical_section: bool,
    /// Any other fields the server includes
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl DistributedStatus {
    /// Election state for display
    pub fn election_state(&self) -> &str {
        self.election_state.as_deref().unwrap_or("idle")
    }

    /// Whether `node_id` is the current leader
    pub fn is_leader_node(&self, node_id: &str) -> bool {
        self.leader_id
            .is_some_and(|leader| leader.to_string() == node_id)
    }
}

/// Result of `GET /v1/distributed/status`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClusterStatus {
    /// The backend runs standalone (HTTP 503)
    Disabled {
        /// Explanation for display
        message: String,
    },
    /// The backend runs as a cluster
    Enabled(Box<DistributedStatus>),
}

impl ClusterStatus {
    /// Whether the distributed system is enabled
    pub fn is_enabled(&self) -> bool {
        matches!(self, ClusterStatus::Enabled(_))
    }
}

/// Response of `POST /v1/distributed/trigger-election`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionTriggered {
    /// Node that started the election
    #[serde(default)]
    pub node_id: Option<serde_json::Value>,
    /// Any other fields the server includes
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// Parse a server timestamp
///
/// Accepts RFC 3339 and the naive ISO form (`2024-01-01T10:00:00.123456`),
/// which is taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_status_is_in_progress() {
        let job: Job = serde_json::from_str(r#"{"status": "pending_gpu"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(!job.status.is_terminal());
        assert!(job.request_id.is_empty());
    }

    #[test]
    fn completed_job_deserializes_payload() {
        let body = r#"{
            "request_id": "3f2a9c1e-7777",
            "status": "completed",
            "result": {
                "label": "Eczema",
                "confidence": 0.91,
                "completed_at": "2024-03-01T12:30:00.250000",
                "extra": {
                    "model": {"framework": "TensorFlow", "version": 2},
                    "top_k": [
                        {"label": "Eczema", "confidence": 0.91},
                        {"label": "Psoriasis", "confidence": 0.04},
                        {"label": "Acne", "confidence": 0.02},
                        {"label": "Lupus", "confidence": 0.01},
                        {"label": "Cellulitis", "confidence": 0.01},
                        {"label": "Ringworm", "confidence": 0.01}
                    ]
                }
            }
        }"#;
        let job: Job = serde_json::from_str(body).unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let payload = job.result.as_ref().unwrap();
        assert_eq!(payload.framework(), "TensorFlow");
        assert_eq!(payload.top_predictions().len(), 5);
        assert_eq!(
            payload.completed_at_utc(),
            Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
                    + chrono::Duration::milliseconds(250)
            )
        );

        let result = AnalysisResult::from_job(job).unwrap();
        assert_eq!(result.label, "Eczema");
        assert_eq!(result.request_id.short(), "3f2a9c1e");
    }

    #[test]
    fn framework_defaults_to_pytorch() {
        let payload = ResultPayload {
            label: "Acne".into(),
            confidence: 0.5,
            completed_at: None,
            extra: None,
        };
        assert_eq!(payload.framework(), "PyTorch");
        assert!(payload.top_predictions().is_empty());
    }

    #[test]
    fn receipt_node_label() {
        let receipt: SubmitReceipt =
            serde_json::from_str(r#"{"request_id": "r1", "assigned_to_node": 2}"#).unwrap();
        assert_eq!(receipt.node_label(), "2");

        let receipt: SubmitReceipt = serde_json::from_str(r#"{"request_id": "r1"}"#).unwrap();
        assert_eq!(receipt.node_label(), "local");
    }

    #[test]
    fn data_url_encodes_base64() {
        let upload = ImageUpload::new("a.png", "image/png", b"Man".to_vec());
        assert_eq!(upload.data_url(), "data:image/png;base64,TWFu");

        let upload = ImageUpload::new("a.png", "image/png", b"Ma".to_vec());
        assert_eq!(upload.data_url(), "data:image/png;base64,TWE=");
    }

    #[test]
    fn cluster_status_tolerates_sparse_body() {
        let status: DistributedStatus =
            serde_json::from_str(r#"{"node_id": 1, "leader_id": 3, "raft_term": 9}"#).unwrap();
        assert_eq!(status.election_state(), "idle");
        assert!(status.is_leader_node("3"));
        assert!(!status.is_leader_node("1"));
        assert!(status.other.contains_key("raft_term"));
    }

    #[test]
    fn progress_event_serialization() {
        let event = Progress::Polling {
            request_id: RequestId::from("r1"),
            attempt: 3,
            elapsed: Duration::from_secs(6),
            status: JobStatus::Processing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "polling");
        assert_eq!(json["elapsed"], 6);
        assert!(!event.is_terminal());
    }
}
