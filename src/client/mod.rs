//! The client facade.
//!
//! [`SkinIaClient`] owns the local database, the shared HTTP client and the
//! session (active credential and API URL). Its methods are organized by domain:
//! - [`auth`] - Login, logout, session restore and registration
//! - [`settings`] - API URL configuration
//! - [`analysis`] - Image analysis and result history
//! - [`cluster`] - Backend health and distributed system dashboard

mod analysis;
mod auth;
mod cluster;
mod settings;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::{Config, normalize_base_url};
use crate::credentials::{Credential, CredentialStore};
use crate::db::{Database, keys};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::transport::HttpTransport;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-process session context
///
/// Holds at most one active credential. Replaced wholesale on login and
/// logout; nothing else reads process-wide state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
    api_url: Option<String>,
}

impl Session {
    /// The active credential, if logged in
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Base URL requests go to, if configured
    pub fn api_url(&self) -> Option<&str> {
        self.api_url.as_deref()
    }

    /// Whether a credential is active
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// History partition of the active credential
    pub fn owner_key(&self) -> Option<String> {
        self.credential.as_ref().map(Credential::owner_key)
    }
}

/// Main client instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct SkinIaClient {
    /// Database instance for persistence
    /// Public for integration tests to inspect stored settings
    pub db: Arc<Database>,
    pub(crate) config: Arc<Config>,
    pub(crate) http: reqwest::Client,
    pub(crate) session: Arc<RwLock<Session>>,
    pub(crate) credentials: CredentialStore,
    pub(crate) history: HistoryStore,
}

impl SkinIaClient {
    /// Create a new client
    ///
    /// Opens (or creates) the SQLite database, runs migrations and loads the
    /// saved API URL. The saved credential is not trusted until
    /// [`restore_session`](Self::restore_session) validates it.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let http = HttpTransport::build_client(&config.api)?;

        let api_url = match db.get_setting(keys::API_URL).await? {
            Some(saved) => match normalize_base_url(&saved) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unusable saved API URL");
                    None
                }
            },
            None => None,
        }
        .or_else(|| {
            config
                .api
                .base_url
                .as_deref()
                .and_then(|url| normalize_base_url(url).ok())
        });

        tracing::info!(
            api_url = api_url.as_deref().unwrap_or("<unset>"),
            database = %config.persistence.database_path.display(),
            "client initialized"
        );

        Ok(Self {
            credentials: CredentialStore::new(db.clone()),
            history: HistoryStore::new(db.clone(), config.history.per_owner_limit),
            db,
            config: Arc::new(config),
            http,
            session: Arc::new(RwLock::new(Session {
                credential: None,
                api_url,
            })),
        })
    }

    /// Configuration the client was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Snapshot of the current session
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Transport for the configured URL, with the active credential if any
    pub(crate) async fn transport(&self) -> Result<HttpTransport> {
        let session = self.session.read().await;
        let api_url = session.api_url.clone().ok_or_else(|| Error::Config {
            message: "API URL is not configured".to_string(),
            key: Some("api.base_url".to_string()),
        })?;

        Ok(HttpTransport::new(
            self.http.clone(),
            api_url,
            session.credential.clone(),
            self.config.api.bypass_header,
        ))
    }

    /// Transport plus the active credential; fails when logged out
    pub(crate) async fn authed_transport(&self) -> Result<(HttpTransport, Credential)> {
        let credential = self
            .session
            .read()
            .await
            .credential
            .clone()
            .ok_or(Error::NotAuthenticated)?;
        let transport = self.transport().await?;
        Ok((transport, credential))
    }
}
