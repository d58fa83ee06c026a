//! API key handling and persistence.

use crate::Result;
use crate::db::{Database, keys};
use std::sync::Arc;

/// An API key identifying the caller to the backend
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap an API key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the request header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Stable fingerprint used to partition history (hex SHA-256 of the key)
    pub fn owner_key(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Persists the single active credential under a well-known settings key
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    /// Create a store on top of the settings table
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The stored credential, if any
    pub async fn load(&self) -> Result<Option<Credential>> {
        Ok(self
            .db
            .get_setting(keys::API_KEY)
            .await?
            .filter(|k| !k.is_empty())
            .map(Credential::new))
    }

    /// Replace the stored credential
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        self.db.set_setting(keys::API_KEY, credential.expose()).await
    }

    /// Forget the stored credential
    pub async fn clear(&self) -> Result<()> {
        self.db.delete_setting(keys::API_KEY).await?;
        Ok(())
    }
}
