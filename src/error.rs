//! Error types for skinia-client
//!
//! This module provides the error taxonomy for the library:
//! - [`TransportError`] - the closed set of outcomes produced once at the HTTP boundary
//! - [`ValidationError`] - bad local input, rejected before any network call
//! - [`DatabaseError`] - local persistence failures
//! - [`Error`] - the top-level type every public operation resolves to
//!
//! Nothing here is fatal to the process. Every failure path ends in one of these
//! variants, and [`Error::user_message`] turns it into the text a presentation
//! layer displays.

use crate::types::RequestId;
use thiserror::Error;

/// Result type alias for skinia-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for skinia-client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "polling.interval")
        key: Option<String>,
    },

    /// Local input rejected before any network call
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Network or HTTP failure, already classified at the transport boundary
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server reported that the analysis job itself failed
    #[error("analysis {request_id} failed: {message}")]
    JobFailed {
        /// Job that failed
        request_id: RequestId,
        /// Server-supplied message, or the default failure text
        message: String,
    },

    /// Poll attempts were exhausted without the job reaching a terminal state
    #[error("analysis {request_id} timed out after {attempts} status checks")]
    Timeout {
        /// Job that never finished
        request_id: RequestId,
        /// Number of status checks performed
        attempts: u32,
    },

    /// Too many status checks failed in a row (or the attempt budget ran out mid-failure)
    #[error("status checks for {request_id} gave up after {attempts} attempts: {last_error}")]
    PollExhausted {
        /// Job being polled
        request_id: RequestId,
        /// Number of status checks performed
        attempts: u32,
        /// The transport error that ended polling
        last_error: TransportError,
    },

    /// The operation was cancelled by its caller
    #[error("operation cancelled")]
    Cancelled,

    /// No credential is active for an operation that needs one
    #[error("not authenticated: no API key is set")]
    NotAuthenticated,

    /// The backend rejected the API key offered at login
    #[error("invalid API key")]
    InvalidCredential,

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The message a user should see for this error
    ///
    /// Job failures show the server's text, timeouts a fixed hint, and exhausted
    /// polling the reason of the last transport error.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Transport(e) => e.reason(),
            Error::JobFailed { message, .. } => message.clone(),
            Error::Timeout { .. } => TIMEOUT_MESSAGE.to_string(),
            Error::PollExhausted { last_error, .. } => last_error.reason(),
            Error::Cancelled => "Analysis cancelled".to_string(),
            Error::NotAuthenticated => "Please log in with an API key first".to_string(),
            Error::InvalidCredential => "Invalid API key. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Text shown when polling runs out of attempts
pub const TIMEOUT_MESSAGE: &str = "Analysis timeout - please try again";

/// Text used when the server reports a failed job without a message
pub const DEFAULT_FAILURE_MESSAGE: &str = "Analysis failed";

/// Text used for a proxy interstitial page in place of a real response
pub const INTERSTITIAL_MESSAGE: &str = "Ngrok interstitial page detected - retrying...";

/// Outcome classification of one HTTP exchange with the backend
///
/// Produced exactly once, where the response is read. Everything upstream
/// (poller, orchestrator, client) matches on these variants instead of
/// inspecting response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never produced a response (connect failure, timeout, reset)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status; `reason` comes from the structured `detail` body when present
    #[error("{reason}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Server `detail`, or a generic status-code message
        reason: String,
    },

    /// The reverse proxy served its warning page instead of the API response
    #[error("Ngrok interstitial page detected - retrying...")]
    Interstitial {
        /// HTTP status of the interstitial, if one was received
        status: Option<u16>,
    },

    /// A success response whose body did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (bad header value, bad multipart MIME type)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An authenticated endpoint was called without a credential
    #[error("no API key available for an authenticated request")]
    MissingCredential,
}

impl TransportError {
    /// Human-readable reason suitable for display
    pub fn reason(&self) -> String {
        match self {
            TransportError::Http { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status code, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            TransportError::Interstitial { status } => *status,
            _ => None,
        }
    }
}

/// Trait for errors that can be classified as transient or not
///
/// Transient failures (network drops, proxy interstitials, 5xx) are expected to
/// clear on their own. Permanent failures (401, 404, malformed bodies) are not.
pub trait IsTransient {
    /// Returns true if the error is expected to clear without user action
    fn is_transient(&self) -> bool;
}

impl IsTransient for TransportError {
    fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Interstitial { .. } => true,
            // Gateway and overload responses from the tunnel or the API workers
            TransportError::Http { status, .. } => *status >= 500 || *status == 429,
            TransportError::InvalidResponse(_) => false,
            TransportError::InvalidRequest(_) => false,
            TransportError::MissingCredential => false,
        }
    }
}

impl IsTransient for Error {
    fn is_transient(&self) -> bool {
        // Poll outcomes already absorbed their transient errors
        matches!(self, Error::Transport(e) if e.is_transient())
    }
}

/// Bad local input, detected before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The file's MIME type is not one of the supported formats
    #[error("Please upload a valid image (JPG, JPEG, or PNG), got {content_type}")]
    UnsupportedFileType {
        /// The rejected MIME type
        content_type: String,
    },

    /// The file exceeds the configured size limit
    #[error("Image size must be less than {max_mb}MB (got {size} bytes)")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured limit in whole megabytes
        max_mb: u64,
    },

    /// The file has no content
    #[error("Image file is empty")]
    EmptyFile,

    /// The API URL could not be parsed as an absolute http(s) URL
    #[error("Invalid URL format: {url}")]
    InvalidUrl {
        /// The rejected input
        url: String,
    },

    /// No name given for registration
    #[error("Please enter your name")]
    EmptyName,

    /// Registration name below the minimum length
    #[error("Name must be at least {min} characters long")]
    NameTooShort {
        /// Minimum number of characters
        min: usize,
    },

    /// Empty API key
    #[error("Please enter an API key")]
    EmptyCredential,
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
