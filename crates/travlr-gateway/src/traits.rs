//! RegistryGateway trait: a pluggable system of record for the registry.

use std::sync::Arc;

use async_trait::async_trait;

use travlr_access::Role;
use travlr_core::{DataKey, Did, Timestamp};

use crate::error::Result;
use crate::wire::TransactionId;

/// A system of record for grants, mirrored by the local registry.
///
/// Writes return the identifier the backend assigned to the transaction.
/// Reads answer with the backend's current view.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Establish the connection to the backend.
    async fn connect(&self) -> Result<()>;

    /// Release the connection.
    async fn disconnect(&self) -> Result<()>;

    /// Register a principal with a role.
    async fn register_principal(&self, id: &Did, role: Role) -> Result<TransactionId>;

    /// Grant `grantee` access to `key`.
    async fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Result<TransactionId>;

    /// Revoke `grantee`'s access to `key` on behalf of `revoker`.
    async fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> Result<TransactionId>;

    /// Record a delegation edge.
    async fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId>;

    /// Remove a delegation edge.
    async fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId>;

    /// Ask the backend to forward `key` from `target` to `requester`.
    async fn request_data_forwarding(
        &self,
        requester: &Did,
        target: &Did,
        key: &DataKey,
    ) -> Result<TransactionId>;

    /// Check if `id` can read `key` right now.
    async fn check_access(&self, id: &Did, key: &DataKey) -> Result<bool>;

    /// Check if `from` may currently authorize `to` to read `key`.
    async fn check_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool>;
}

#[async_trait]
impl<G: RegistryGateway + ?Sized> RegistryGateway for Arc<G> {
    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        (**self).disconnect().await
    }

    async fn register_principal(&self, id: &Did, role: Role) -> Result<TransactionId> {
        (**self).register_principal(id, role).await
    }

    async fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Result<TransactionId> {
        (**self).grant_access(granter, grantee, key, expires_at).await
    }

    async fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> Result<TransactionId> {
        (**self).revoke_access(revoker, grantee, key).await
    }

    async fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        (**self).add_delegation(from, to, key).await
    }

    async fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        (**self).remove_delegation(from, to, key).await
    }

    async fn request_data_forwarding(
        &self,
        requester: &Did,
        target: &Did,
        key: &DataKey,
    ) -> Result<TransactionId> {
        (**self).request_data_forwarding(requester, target, key).await
    }

    async fn check_access(&self, id: &Did, key: &DataKey) -> Result<bool> {
        (**self).check_access(id, key).await
    }

    async fn check_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        (**self).check_delegation(from, to, key).await
    }
}
