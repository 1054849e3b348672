//! The authorization seam consumed by the exchange layer.

use std::sync::Arc;

use async_trait::async_trait;

use travlr_core::{DataKey, Did};

use crate::error::Result;
use crate::registry::AccessRegistry;

/// Answers authorization queries.
///
/// Implemented by the local [`AccessRegistry`] and by registries backed by a
/// remote system of record. Only infrastructure failures are errors; a
/// denial is `Ok(false)`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Check if `principal` can read `key` right now.
    async fn has_access(&self, principal: &Did, key: &DataKey) -> Result<bool>;

    /// Check if `from` may currently authorize `to` to read `key`.
    async fn can_delegate(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool>;
}

#[async_trait]
impl Authorizer for AccessRegistry {
    async fn has_access(&self, principal: &Did, key: &DataKey) -> Result<bool> {
        Ok(AccessRegistry::has_access(self, principal, key))
    }

    async fn can_delegate(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        Ok(AccessRegistry::can_delegate(self, from, to, key))
    }
}

#[async_trait]
impl<T: Authorizer + ?Sized> Authorizer for Arc<T> {
    async fn has_access(&self, principal: &Did, key: &DataKey) -> Result<bool> {
        (**self).has_access(principal, key).await
    }

    async fn can_delegate(&self, from: &Did, to: &Did, key: &DataKey) -> Result<bool> {
        (**self).can_delegate(from, to, key).await
    }
}
