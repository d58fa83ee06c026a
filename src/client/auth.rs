//! Login, logout, session restore and registration.

use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::Registration;
use crate::validation::{credential_input, registration_request};

use super::SkinIaClient;

impl SkinIaClient {
    /// Validate an API key against the backend and make it the active credential
    ///
    /// The key is persisted only after the backend accepts it.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a blank key (no request is made)
    /// - [`Error::InvalidCredential`] when the backend rejects the key or is unreachable
    pub async fn login(&self, api_key: &str) -> Result<()> {
        let credential = Credential::new(credential_input(api_key)?);
        let transport = self.transport().await?;

        if !transport.validate_credential(&credential).await {
            tracing::warn!("login rejected");
            return Err(Error::InvalidCredential);
        }

        self.credentials.save(&credential).await?;
        self.session.write().await.credential = Some(credential);
        tracing::info!("logged in");
        Ok(())
    }

    /// Forget the active credential, in memory and on disk
    pub async fn logout(&self) -> Result<()> {
        self.credentials.clear().await?;
        self.session.write().await.credential = None;
        tracing::info!("logged out");
        Ok(())
    }

    /// Reactivate the stored credential if the backend still accepts it
    ///
    /// Returns `true` when a session was restored. A stored key that fails
    /// validation is deleted.
    pub async fn restore_session(&self) -> Result<bool> {
        let Some(credential) = self.credentials.load().await? else {
            return Ok(false);
        };

        let transport = self.transport().await?;
        if !transport.validate_credential(&credential).await {
            tracing::info!("stored API key no longer valid, clearing it");
            self.credentials.clear().await?;
            return Ok(false);
        }

        self.session.write().await.credential = Some(credential);
        tracing::info!("session restored");
        Ok(true)
    }

    /// Whether a credential is active
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Create an account and return its newly issued API key
    ///
    /// The name is trimmed and must have at least three characters; a blank
    /// email is sent as absent. Registering does not log in.
    pub async fn register(&self, name: &str, email: Option<&str>) -> Result<Registration> {
        let request = registration_request(name, email)?;
        let transport = self.transport().await?;

        let registration = transport.register(&request).await?;
        tracing::info!(name = %registration.name, "account registered");
        Ok(registration)
    }
}
