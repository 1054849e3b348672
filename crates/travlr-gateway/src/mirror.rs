//! A local registry kept as a cache of a gateway.

use std::sync::Arc;

use async_trait::async_trait;

use travlr_access::{AccessError, AccessRegistry, Authorizer, Role};
use travlr_core::{DataKey, Did, Timestamp};

use crate::error::Result;
use crate::traits::RegistryGateway;
use crate::wire::TransactionId;

/// Registry whose authoritative state lives behind a [`RegistryGateway`].
///
/// Writes go to the gateway first and are applied to the local mirror only
/// once accepted. Authorization queries always ask the gateway; the mirror
/// is never authoritative, only a view for inspection.
pub struct MirroredRegistry<G: RegistryGateway> {
    gateway: G,
    mirror: Arc<AccessRegistry>,
}

impl<G: RegistryGateway> MirroredRegistry<G> {
    /// Mirror `gateway` into `mirror`.
    pub fn new(gateway: G, mirror: Arc<AccessRegistry>) -> Self {
        Self { gateway, mirror }
    }

    /// The system of record.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The local mirror.
    pub fn mirror(&self) -> &Arc<AccessRegistry> {
        &self.mirror
    }

    pub async fn register_principal(&self, id: &Did, role: Role) -> Result<TransactionId> {
        let tx = self.gateway.register_principal(id, role).await?;
        self.mirror.register_principal(id, role);
        Ok(tx)
    }

    pub async fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Result<TransactionId> {
        let tx = self
            .gateway
            .grant_access(granter, grantee, key, expires_at)
            .await?;
        self.mirror.grant_access(granter, grantee, key, expires_at);
        Ok(tx)
    }

    pub async fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> Result<TransactionId> {
        let tx = self.gateway.revoke_access(revoker, grantee, key).await?;
        self.mirror.revoke_access(revoker, grantee, key);
        Ok(tx)
    }

    pub async fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        let tx = self.gateway.add_delegation(from, to, key).await?;
        self.mirror.add_delegation(from, to, key);
        Ok(tx)
    }

    pub async fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        let tx = self.gateway.remove_delegation(from, to, key).await?;
        self.mirror.remove_delegation(from, to, key);
        Ok(tx)
    }

    pub async fn request_data_forwarding(
        &self,
        requester: &Did,
        target: &Did,
        key: &DataKey,
    ) -> Result<TransactionId> {
        self.gateway
            .request_data_forwarding(requester, target, key)
            .await
    }

    /// Ask the gateway whether `id` can read `key`, dropping a stale local
    /// grant if the gateway says no.
    pub async fn refresh_access(&self, id: &Did, key: &DataKey) -> Result<bool> {
        let allowed = self.gateway.check_access(id, key).await?;

        if !allowed && AccessRegistry::has_access(&self.mirror, id, key) {
            if let Some(stale) = self.mirror.grant(key, id) {
                self.mirror.revoke_access(&stale.granted_by, id, key);
                tracing::debug!(principal = %id, %key, "dropped stale mirrored grant");
            }
        }
        Ok(allowed)
    }

    pub async fn check_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        self.gateway.check_delegation(from, to, key).await
    }
}

#[async_trait]
impl<G: RegistryGateway> Authorizer for MirroredRegistry<G> {
    async fn has_access(&self, principal: &Did, key: &DataKey) -> travlr_access::Result<bool> {
        self.refresh_access(principal, key)
            .await
            .map_err(AccessError::from)
    }

    async fn can_delegate(&self, from: &Did, to: &Did, key: &DataKey) -> travlr_access::Result<bool> {
        self.check_delegation(from, to, key)
            .await
            .map_err(AccessError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalGateway;

    fn setup() -> (MirroredRegistry<LocalGateway>, Arc<AccessRegistry>) {
        let record = Arc::new(AccessRegistry::new());
        let gateway = LocalGateway::new(Arc::clone(&record));
        (MirroredRegistry::new(gateway, Arc::new(AccessRegistry::new())), record)
    }

    #[tokio::test]
    async fn test_writes_reach_gateway_and_mirror() {
        let (registry, record) = setup();
        let org = Did::from("did:org1");
        let user = Did::from("did:user1");
        let key = DataKey::from("k");

        registry.register_principal(&org, Role::Organization).await.unwrap();
        registry.grant_access(&org, &user, &key, None).await.unwrap();

        assert!(AccessRegistry::has_access(&record, &user, &key));
        assert!(AccessRegistry::has_access(registry.mirror(), &user, &key));
        assert!(Authorizer::has_access(&registry, &user, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_gateway_answer_wins_over_mirror() {
        let (registry, record) = setup();
        let org = Did::from("did:org1");
        let user = Did::from("did:user1");
        let key = DataKey::from("k");

        registry.grant_access(&org, &user, &key, None).await.unwrap();

        // Revoked at the system of record behind the mirror's back.
        record.revoke_access(&org, &user, &key);
        assert!(AccessRegistry::has_access(registry.mirror(), &user, &key));

        assert!(!Authorizer::has_access(&registry, &user, &key).await.unwrap());
        assert!(!AccessRegistry::has_access(registry.mirror(), &user, &key));
    }

    #[tokio::test]
    async fn test_delegation_is_checked_remotely() {
        let (registry, _record) = setup();
        let org = Did::from("did:org1");
        let user = Did::from("did:user1");
        let key = DataKey::from("k");

        registry.register_principal(&org, Role::Organization).await.unwrap();
        registry.grant_access(&org, &org, &key, None).await.unwrap();
        registry.add_delegation(&org, &user, &key).await.unwrap();

        assert!(registry.can_delegate(&org, &user, &key).await.unwrap());
        registry.remove_delegation(&org, &user, &key).await.unwrap();
        assert!(!registry.can_delegate(&org, &user, &key).await.unwrap());
    }
}
