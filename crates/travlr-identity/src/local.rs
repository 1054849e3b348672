//! In-process identity provider holding Ed25519 keys in memory.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use serde_json::{Map, Value};

use travlr_core::{now_millis, Did};

use crate::credential::{Credential, Identity};
use crate::error::{IdentityError, Result};
use crate::provider::IdentityProvider;

/// Keys live for the lifetime of the provider and are never persisted.
#[derive(Default)]
pub struct LocalIdentityProvider {
    keys: RwLock<HashMap<Did, SigningKey>>,
}

impl LocalIdentityProvider {
    /// Create a provider holding no keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the key derived from `seed`.
    pub fn import_seed(&self, seed: &[u8; 32]) -> Identity {
        self.insert(SigningKey::from_bytes(seed))
    }

    /// Whether this provider can sign as `did`.
    pub fn holds(&self, did: &Did) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(did)
    }

    fn insert(&self, key: SigningKey) -> Identity {
        let identity = Identity::from_key(&key.verifying_key());
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity.did.clone(), key);
        identity
    }
}

impl fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.keys.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("LocalIdentityProvider")
            .field("identities", &count)
            .finish()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_identity(&self) -> Result<Identity> {
        let key = SigningKey::generate(&mut rand::thread_rng());
        let identity = self.insert(key);
        tracing::debug!(did = %identity.did, "created identity");
        Ok(identity)
    }

    async fn issue_claim(
        &self,
        issuer: &Did,
        subject: &Did,
        claims: Map<String, Value>,
    ) -> Result<Credential> {
        let credential = {
            let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
            let key = keys
                .get(issuer)
                .ok_or_else(|| IdentityError::UnknownIdentity(issuer.clone()))?;
            Credential::issue(key, subject, claims, now_millis())?
        };

        tracing::debug!(%issuer, %subject, id = %credential.id, "issued credential");
        Ok(credential)
    }

    async fn verify_claim(&self, credential: &Credential) -> Result<bool> {
        let valid = credential.verify();
        if !valid {
            tracing::debug!(id = %credential.id, issuer = %credential.issuer, "credential failed verification");
        }
        Ok(valid)
    }
}
