//! Configuration types for skinia-client

use crate::error::{Error, Result, ValidationError};
use crate::types::ModelVariant;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Backend connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API (e.g., "https://abc.ngrok-free.app")
    ///
    /// A URL saved through [`SkinIaClient::set_api_url`](crate::SkinIaClient::set_api_url)
    /// takes precedence over this value.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,

    /// Send the header that skips the tunnel's browser warning page (default: true)
    #[serde(default = "default_true")]
    pub bypass_header: bool,

    /// Which classification endpoint uploads go to (default: pytorch)
    #[serde(default)]
    pub variant: ModelVariant,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: default_request_timeout(),
            bypass_header: true,
            variant: ModelVariant::default(),
        }
    }
}

/// Status polling behavior
///
/// Unattended polling is bounded by `max_attempts * interval`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Fixed delay before each status check (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_millis")]
    pub interval: Duration,

    /// Hard cap on status checks regardless of outcome (default: 60)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Failed status checks tolerated in a row before giving up (default: 5)
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

/// Local checks applied to an image before it is sent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Accepted MIME types (default: image/jpeg, image/jpg, image/png)
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,

    /// Largest accepted file in bytes (default: 10 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            supported_formats: default_supported_formats(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Result history retention
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Entries kept per credential (default: 20)
    #[serde(default = "default_per_owner_limit")]
    pub per_owner_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            per_owner_limit: default_per_owner_limit(),
        }
    }
}

/// Local storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite file holding the credential, API URL and history (default: "./skinia.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for SkinIaClient
///
/// Fields are organized into sub-configs:
/// - [`api`](ApiConfig): backend URL, timeouts, endpoint variant
/// - [`polling`](PollConfig): interval and give-up bounds for status checks
/// - [`upload`](UploadConfig): accepted formats and size limit
/// - [`history`](HistoryConfig): per-credential retention
/// - [`persistence`](PersistenceConfig): database location
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling behavior
    #[serde(default)]
    pub polling: PollConfig,

    /// Upload validation
    #[serde(default)]
    pub upload: UploadConfig,

    /// History retention
    #[serde(default)]
    pub history: HistoryConfig,

    /// Local storage
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Check the configuration for values that would make the client unusable
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval.is_zero() {
            return Err(config_error(
                "poll interval must be greater than zero",
                "polling.interval",
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(config_error(
                "max_attempts must be at least 1",
                "polling.max_attempts",
            ));
        }
        if self.polling.max_consecutive_errors == 0 {
            return Err(config_error(
                "max_consecutive_errors must be at least 1",
                "polling.max_consecutive_errors",
            ));
        }
        if self.history.per_owner_limit == 0 {
            return Err(config_error(
                "per_owner_limit must be at least 1",
                "history.per_owner_limit",
            ));
        }
        if self.upload.supported_formats.is_empty() {
            return Err(config_error(
                "at least one supported format is required",
                "upload.supported_formats",
            ));
        }
        if let Some(url) = &self.api.base_url {
            normalize_base_url(url).map_err(|e| config_error(e.to_string(), "api.base_url"))?;
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// Normalize a user-entered API base URL
///
/// Trims whitespace, requires an absolute http(s) URL and strips one trailing slash.
pub fn normalize_base_url(input: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidUrl {
        url: trimmed.to_string(),
    };

    let parsed = url::Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }

    Ok(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_max_attempts() -> u32 {
    60
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_supported_formats() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/jpg".to_string(),
        "image/png".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_per_owner_limit() -> usize {
    20
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./skinia.db")
}

// Duration serialization helper (milliseconds)
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
