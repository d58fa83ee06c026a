//! Common test utilities for skinia-client integration tests

#![allow(dead_code)]

use futures::StreamExt;
use skinia_client::{AnalysisHandle, AnalysisResult, Config, Progress, Result, SkinIaClient};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Key the mock backend accepts
pub const API_KEY: &str = "sk_integration";

/// Smallest payload with a JPEG signature
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Config pointing at `server`, with fast polling and a database in `temp_dir`
pub fn fast_config(temp_dir: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("skinia.db");
    config.api.base_url = Some(server.uri());
    config.polling.interval = Duration::from_millis(5);
    config.polling.max_attempts = 20;
    config
}

/// Start a backend that accepts [`API_KEY`] and a client logged in with it
pub async fn logged_in(server: &MockServer) -> (SkinIaClient, TempDir) {
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let client = SkinIaClient::new(fast_config(&temp_dir, server)).await.unwrap();
    client.login(API_KEY).await.unwrap();
    (client, temp_dir)
}

/// Mount a submit endpoint that acknowledges with `request_id`
pub async fn mount_submit(server: &MockServer, request_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/analyze-pytorch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "request_id": request_id,
            "status": "queued",
            "assigned_to_node": 1
        })))
        .mount(server)
        .await;
}

/// Mount status responses for `request_id`, served in order; the last one repeats
pub async fn mount_status_sequence(
    server: &MockServer,
    request_id: &str,
    responses: Vec<ResponseTemplate>,
) {
    let count = responses.len();
    for (i, response) in responses.into_iter().enumerate() {
        let mock = Mock::given(method("GET")).and(path(format!("/v1/status/{request_id}")));
        let mock = mock.respond_with(response);
        if i + 1 < count {
            mock.up_to_n_times(1).mount(server).await;
        } else {
            mock.mount(server).await;
        }
    }
}

/// JSON status body
pub fn status(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// A completed job body for `request_id`
pub fn completed(request_id: &str, label: &str, confidence: f64) -> ResponseTemplate {
    status(serde_json::json!({
        "request_id": request_id,
        "status": "completed",
        "result": {
            "label": label,
            "confidence": confidence,
            "completed_at": "2024-04-02T16:20:00.123456"
        }
    }))
}

/// Drain a handle's events and return them with the final result
pub async fn drain(mut handle: AnalysisHandle) -> (Vec<Progress>, Result<AnalysisResult>) {
    let mut events = Vec::new();
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = handle.next().await {
            events.push(event);
        }
    })
    .await;
    assert!(drained.is_ok(), "progress stream did not finish");
    (events, handle.result().await)
}
