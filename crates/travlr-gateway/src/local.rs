//! In-process gateway backed by an [`AccessRegistry`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use travlr_access::{AccessRegistry, Role};
use travlr_core::{DataKey, Did, Timestamp};

use crate::error::Result;
use crate::traits::RegistryGateway;
use crate::wire::{DataForwarding, TransactionId};

/// Forwarding requests kept until drained; older ones are dropped first.
pub const MAX_QUEUED_FORWARDING: usize = 1024;

/// A gateway whose system of record is an in-process registry.
///
/// Transaction ids are `local_tx_<n>`, counting from 1.
#[derive(Debug, Default)]
pub struct LocalGateway {
    registry: Arc<AccessRegistry>,
    next_tx: AtomicU64,
    forwarding: Mutex<VecDeque<DataForwarding>>,
}

impl LocalGateway {
    /// Create a gateway over `registry`.
    pub fn new(registry: Arc<AccessRegistry>) -> Self {
        Self {
            registry,
            next_tx: AtomicU64::new(0),
            forwarding: Mutex::new(VecDeque::new()),
        }
    }

    /// The backing registry.
    pub fn registry(&self) -> &Arc<AccessRegistry> {
        &self.registry
    }

    /// Take the queued forwarding requests, oldest first.
    pub fn drain_forwarding_requests(&self) -> Vec<DataForwarding> {
        self.forwarding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    fn next_tx(&self) -> TransactionId {
        let n = self.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        TransactionId(format!("local_tx_{}", n))
    }
}

#[async_trait]
impl RegistryGateway for LocalGateway {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn register_principal(&self, id: &Did, role: Role) -> Result<TransactionId> {
        self.registry.register_principal(id, role);
        Ok(self.next_tx())
    }

    async fn grant_access(
        &self,
        granter: &Did,
        grantee: &Did,
        key: &DataKey,
        expires_at: Option<Timestamp>,
    ) -> Result<TransactionId> {
        self.registry.grant_access(granter, grantee, key, expires_at);
        Ok(self.next_tx())
    }

    async fn revoke_access(&self, revoker: &Did, grantee: &Did, key: &DataKey) -> Result<TransactionId> {
        self.registry.revoke_access(revoker, grantee, key);
        Ok(self.next_tx())
    }

    async fn add_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        self.registry.add_delegation(from, to, key);
        Ok(self.next_tx())
    }

    async fn remove_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<TransactionId> {
        self.registry.remove_delegation(from, to, key);
        Ok(self.next_tx())
    }

    async fn request_data_forwarding(
        &self,
        requester: &Did,
        target: &Did,
        key: &DataKey,
    ) -> Result<TransactionId> {
        tracing::info!(%requester, %target, %key, "data forwarding requested");
        let mut queue = self.forwarding.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() == MAX_QUEUED_FORWARDING {
            queue.pop_front();
            tracing::warn!("forwarding queue full, dropped oldest request");
        }
        queue.push_back(DataForwarding {
            requester: requester.clone(),
            target: target.clone(),
            data_key: key.clone(),
        });
        drop(queue);
        Ok(self.next_tx())
    }

    async fn check_access(&self, id: &Did, key: &DataKey) -> Result<bool> {
        Ok(self.registry.has_access(id, key))
    }

    async fn check_delegation(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        Ok(self.registry.can_delegate(from, to, key))
    }
}
