//! Response classification at the HTTP boundary.
//!
//! Every response body is read once here and turned into either a decoded
//! value or a [`TransportError`]. Nothing upstream looks at raw bodies.

use crate::error::TransportError;
use serde::de::DeserializeOwned;

/// Substring identifying the tunnel's browser warning page
pub(crate) const INTERSTITIAL_MARKER: &str = "ngrok";

/// Whether a non-JSON body is the reverse proxy's interstitial page
pub(crate) fn is_interstitial(body: &str) -> bool {
    body.to_ascii_lowercase().contains(INTERSTITIAL_MARKER)
}

/// Map a network-level failure to a transport error
pub(crate) fn network_error(e: reqwest::Error) -> TransportError {
    let message = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    TransportError::Network(message)
}

/// Decode a success body
///
/// An undecodable body that looks like the interstitial page is classified as
/// [`TransportError::Interstitial`]; anything else as
/// [`TransportError::InvalidResponse`].
pub(crate) fn decode_success<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> Result<T, TransportError> {
    serde_json::from_str(body).map_err(|e| {
        if is_interstitial(body) {
            TransportError::Interstitial {
                status: Some(status),
            }
        } else {
            TransportError::InvalidResponse(e.to_string())
        }
    })
}

/// Classify a non-success response
///
/// Prefers the structured `{"detail": ...}` body; falls back to the raw text,
/// which either identifies the interstitial page or yields `fallback`.
pub(crate) fn classify_failure(status: u16, body: &str, fallback: String) -> TransportError {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let reason = match value.get("detail") {
                Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
                Some(serde_json::Value::Null) | None => fallback,
                // FastAPI validation errors carry a list of objects
                Some(other) => other.to_string(),
            };
            TransportError::Http { status, reason }
        }
        Err(_) if is_interstitial(body) => TransportError::Interstitial {
            status: Some(status),
        },
        Err(_) => TransportError::Http {
            status,
            reason: fallback,
        },
    }
}

/// Read a response and decode it, or classify its failure
pub(crate) async fn read_json<T, F>(response: reqwest::Response, fallback: F) -> Result<T, TransportError>
where
    T: DeserializeOwned,
    F: FnOnce(u16) -> String,
{
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;

    if status.is_success() {
        decode_success(status.as_u16(), &body)
    } else {
        Err(classify_failure(status.as_u16(), &body, fallback(status.as_u16())))
    }
}
