//! Client facade tests against a mocked backend.


use super::SkinIaClient;
use crate::config::Config;
use crate::transport::API_KEY_HEADER;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(super) const VALID_KEY: &str = "sk_valid";

pub(super) fn test_config(temp_dir: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.api.base_url = Some(server.uri());
    config.polling.interval = Duration::from_millis(5);
    config.polling.max_attempts = 20;
    config
}

/// Client with a database in a fresh temp dir (which must be kept alive)
pub(super) async fn create_test_client(server: &MockServer) -> (SkinIaClient, TempDir) {
    let temp_dir = tempdir().unwrap();
    let client = SkinIaClient::new(test_config(&temp_dir, server))
        .await
        .unwrap();
    (client, temp_dir)
}

/// `/healthz` accepts `keys` and rejects everything else with 401
pub(super) async fn mount_healthz(server: &MockServer, keys: &[&str]) {
    for key in keys {
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .and(header(API_KEY_HEADER, *key))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Invalid API key"})))
        .mount(server)
        .await;
}

/// Client logged in with [`VALID_KEY`]
pub(super) async fn logged_in_client(server: &MockServer) -> (SkinIaClient, TempDir) {
    mount_healthz(server, &[VALID_KEY]).await;
    let (client, temp_dir) = create_test_client(server).await;
    client.login(VALID_KEY).await.unwrap();
    (client, temp_dir)
}
