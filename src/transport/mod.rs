//! HTTP access to the Skin IA backend.
//!
//! [`HttpTransport`] performs one-shot requests and normalizes every outcome
//! into a value or a [`TransportError`]. It never retries and never touches
//! shared state; retry policy lives in the [`Poller`](crate::poller::Poller).

mod classify;

use crate::config::ApiConfig;
use crate::credentials::Credential;
use crate::error::TransportError;
use crate::types::{
    ClusterStatus, DistributedStatus, ElectionTriggered, ImageUpload, Job, ModelVariant,
    Registration, RegistrationRequest, RequestId, SubmitReceipt,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use classify::{network_error, read_json};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header that makes the tunnel skip its browser warning page
pub const BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Message returned for a 503 from the cluster status endpoint
pub const CLUSTER_DISABLED_MESSAGE: &str = "Distributed system not enabled";

/// The operations the poller and orchestrator depend on
///
/// Implemented by [`HttpTransport`]; tests substitute scripted fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an image for analysis and return the job acknowledgement
    async fn submit(
        &self,
        upload: &ImageUpload,
        variant: ModelVariant,
    ) -> Result<SubmitReceipt, TransportError>;

    /// Fetch the current state of a job
    async fn poll_once(&self, request_id: &RequestId) -> Result<Job, TransportError>;

    /// Liveness probe with a candidate key; any failure reads as `false`
    async fn validate_credential(&self, credential: &Credential) -> bool;
}

/// reqwest-backed [`Transport`]
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    credential: Option<Credential>,
    bypass_header: bool,
}

impl HttpTransport {
    /// Create a transport for `base_url`, authenticating with `credential` when given
    ///
    /// `http` is shared so connection pools survive session changes.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        credential: Option<Credential>,
        bypass_header: bool,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            credential,
            bypass_header,
        }
    }

    /// Build the shared HTTP client from the API settings
    pub fn build_client(config: &ApiConfig) -> crate::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("skinia-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::Error::Other(format!("Failed to create HTTP client: {}", e)))
    }

    /// The base URL requests go to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A copy of this transport authenticating with `credential`
    pub fn with_credential(&self, credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(&self, credential: Option<&Credential>) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        if self.bypass_header {
            headers.insert(
                HeaderName::from_static(BYPASS_HEADER),
                HeaderValue::from_static("true"),
            );
        }
        if let Some(credential) = credential {
            let mut value = HeaderValue::from_str(credential.expose())
                .map_err(|e| TransportError::InvalidRequest(format!("API key header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static("x-api-key"), value);
        }
        Ok(headers)
    }

    fn authed(&self) -> Result<HeaderMap, TransportError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(TransportError::MissingCredential)?;
        self.headers(Some(credential))
    }

    /// `GET /healthz`; any non-2xx is an error
    pub async fn health_check(&self) -> Result<(), TransportError> {
        let response = self
            .http
            .get(self.url("/healthz"))
            .headers(self.headers(self.credential.as_ref())?)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(classify::classify_failure(
                status.as_u16(),
                &body,
                format!("Health check failed: {}", status.as_u16()),
            ))
        }
    }

    /// `POST /v1/register`; unauthenticated
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Registration, TransportError> {
        let response = self
            .http
            .post(self.url("/v1/register"))
            .headers(self.headers(None)?)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response, |status| format!("Registration failed: {}", status)).await
    }

    /// `GET /v1/distributed/status`; a 503 means the backend runs standalone
    pub async fn distributed_status(&self) -> Result<ClusterStatus, TransportError> {
        let response = self
            .http
            .get(self.url("/v1/distributed/status"))
            .headers(self.authed()?)
            .send()
            .await
            .map_err(network_error)?;

        if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            debug!("distributed system disabled on backend");
            return Ok(ClusterStatus::Disabled {
                message: CLUSTER_DISABLED_MESSAGE.to_string(),
            });
        }

        let status: DistributedStatus =
            read_json(response, |status| format!("Status fetch failed: {}", status)).await?;
        Ok(ClusterStatus::Enabled(Box::new(status)))
    }

    /// `POST /v1/distributed/trigger-election`
    pub async fn trigger_election(&self) -> Result<ElectionTriggered, TransportError> {
        let response = self
            .http
            .post(self.url("/v1/distributed/trigger-election"))
            .headers(self.authed()?)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response, |status| format!("Election trigger failed: {}", status)).await
    }

    /// `GET /v1/hardware`; the body shape is backend-defined
    pub async fn hardware_info(&self) -> Result<serde_json::Value, TransportError> {
        let response = self
            .http
            .get(self.url("/v1/hardware"))
            .headers(self.authed()?)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response, |status| format!("Hardware info failed: {}", status)).await
    }

    /// `POST /v1/distributed/critical-section-demo`
    pub async fn critical_section_demo(&self) -> Result<serde_json::Value, TransportError> {
        let response = self
            .http
            .post(self.url("/v1/distributed/critical-section-demo"))
            .headers(self.authed()?)
            .send()
            .await
            .map_err(network_error)?;

        read_json(response, |status| format!("Mutex demo failed: {}", status)).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn submit(
        &self,
        upload: &ImageUpload,
        variant: ModelVariant,
    ) -> Result<SubmitReceipt, TransportError> {
        let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| TransportError::InvalidRequest(format!("content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(
            endpoint = variant.endpoint(),
            file_name = %upload.file_name,
            size = upload.size(),
            "submitting image"
        );

        let response = self
            .http
            .post(self.url(variant.endpoint()))
            .headers(self.authed()?)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let receipt: SubmitReceipt =
            read_json(response, |status| format!("Upload failed: {}", status)).await?;

        if receipt.request_id.is_empty() {
            return Err(TransportError::InvalidResponse(
                "acknowledgement carried no request_id".to_string(),
            ));
        }
        Ok(receipt)
    }

    async fn poll_once(&self, request_id: &RequestId) -> Result<Job, TransportError> {
        let path = format!(
            "/v1/status/{}",
            urlencoding::encode(request_id.as_str())
        );
        let response = self
            .http
            .get(self.url(&path))
            .headers(self.authed()?)
            .send()
            .await
            .map_err(network_error)?;

        let mut job: Job =
            read_json(response, |status| format!("Status check failed: {}", status)).await?;

        if job.request_id.is_empty() {
            job.request_id = request_id.clone();
        }
        debug!(request_id = %request_id, status = ?job.status, "status checked");
        Ok(job)
    }

    async fn validate_credential(&self, credential: &Credential) -> bool {
        let headers = match self.headers(Some(credential)) {
            Ok(headers) => headers,
            Err(e) => {
                warn!(error = %e, "credential cannot be sent as a header");
                return false;
            }
        };

        match self
            .http
            .get(self.url("/healthz"))
            .headers(headers)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "credential validation request failed");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
