//! IdentityProvider trait: creates DIDs and issues and checks credentials.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use travlr_core::Did;

use crate::credential::{Credential, Identity};
use crate::error::Result;

/// Source of identities and signed claims.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a fresh identity whose signing key this provider holds.
    async fn create_identity(&self) -> Result<Identity>;

    /// Sign `claims` about `subject` as `issuer`.
    ///
    /// Fails with [`IdentityError::UnknownIdentity`](crate::IdentityError::UnknownIdentity)
    /// if this provider does not hold the issuer's key.
    async fn issue_claim(
        &self,
        issuer: &Did,
        subject: &Did,
        claims: Map<String, Value>,
    ) -> Result<Credential>;

    /// Check a credential, whoever issued it.
    async fn verify_claim(&self, credential: &Credential) -> Result<bool>;
}

#[async_trait]
impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    async fn create_identity(&self) -> Result<Identity> {
        (**self).create_identity().await
    }

    async fn issue_claim(
        &self,
        issuer: &Did,
        subject: &Did,
        claims: Map<String, Value>,
    ) -> Result<Credential> {
        (**self).issue_claim(issuer, subject, claims).await
    }

    async fn verify_claim(&self, credential: &Credential) -> Result<bool> {
        (**self).verify_claim(credential).await
    }
}
