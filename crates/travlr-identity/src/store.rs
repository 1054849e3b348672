//! Credentials kept in a versioned store under `vc:<id>` keys.

use serde_json::{Map, Value};

use travlr_core::{DataKey, Did};
use travlr_store::VersionedStore;

use crate::credential::Credential;
use crate::error::Result;
use crate::provider::IdentityProvider;

/// Key prefix of stored credentials.
pub const CREDENTIAL_PREFIX: &str = "vc:";

/// The store key of credential `id`.
pub fn credential_key(id: &str) -> DataKey {
    DataKey::new(format!("{}{}", CREDENTIAL_PREFIX, id))
}

/// Credential bookkeeping on top of a record store.
///
/// Credentials share the store with ordinary records; only keys with the
/// `vc:` prefix are treated as credentials. Storing the same credential
/// again appends a new version of the same key.
pub struct CredentialStore<S: VersionedStore, P: IdentityProvider> {
    store: S,
    provider: P,
}

impl<S: VersionedStore, P: IdentityProvider> CredentialStore<S, P> {
    /// Create a credential store.
    pub fn new(store: S, provider: P) -> Self {
        Self { store, provider }
    }

    /// The identity provider issuing and checking credentials.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Issue a credential and store it.
    pub async fn generate(
        &self,
        issuer: &Did,
        subject: &Did,
        claims: Map<String, Value>,
    ) -> Result<Credential> {
        let credential = self.provider.issue_claim(issuer, subject, claims).await?;
        self.store(&credential).await?;
        Ok(credential)
    }

    /// Store a credential under `vc:<id>`. Returns the key used.
    pub async fn store(&self, credential: &Credential) -> Result<DataKey> {
        let key = credential_key(&credential.id);
        self.store.put(&key, serde_json::to_value(credential)?).await?;
        tracing::debug!(%key, "stored credential");
        Ok(key)
    }

    /// Load the credential with `id`.
    pub async fn get(&self, id: &str) -> Result<Option<Credential>> {
        match self.store.get_latest(&credential_key(id)).await? {
            Some(version) => Ok(Some(serde_json::from_value(version.value)?)),
            None => Ok(None),
        }
    }

    /// Keys of every stored credential, in order.
    pub async fn list(&self) -> Result<Vec<DataKey>> {
        Ok(self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter(|key| key.as_str().starts_with(CREDENTIAL_PREFIX))
            .collect())
    }

    /// Check a credential through the provider.
    pub async fn verify(&self, credential: &Credential) -> Result<bool> {
        self.provider.verify_claim(credential).await
    }
}
