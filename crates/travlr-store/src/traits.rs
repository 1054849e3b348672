//! VersionedStore trait: the abstract interface for record persistence.
//!
//! Implementations include in-memory (full history), file-backed (latest
//! value persisted) and SQLite (full history persisted).

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use travlr_core::{DataKey, Timestamp};

use crate::error::Result;

/// One immutable snapshot of a key's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// The stored value. Opaque to the store.
    pub value: Value,

    /// When this version was appended (Unix ms).
    pub timestamp: Timestamp,

    /// Zero-based position in the key's history.
    pub version: u64,
}

/// Append-only, multi-version storage keyed by [`DataKey`].
///
/// # Design Notes
///
/// - **Append-only**: `put` always appends; existing versions never change.
/// - **Dense numbering**: version numbers per key start at 0 and have no gaps.
/// - **No authorization**: callers gate access before reaching the store.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Append a new version of `key` and return it.
    async fn put(&self, key: &DataKey, value: Value) -> Result<Version>;

    /// Get the most recently appended version.
    async fn get_latest(&self, key: &DataKey) -> Result<Option<Version>>;

    /// Get a version by its number.
    async fn get_version(&self, key: &DataKey, version: u64) -> Result<Option<Version>>;

    /// List all keys with at least one version.
    async fn list_keys(&self) -> Result<BTreeSet<DataKey>>;

    /// Remove every version of `key`. Returns whether the key existed.
    async fn delete(&self, key: &DataKey) -> Result<bool>;

    /// Get all versions of `key`, oldest first.
    async fn history(&self, key: &DataKey) -> Result<Vec<Version>>;
}

#[async_trait]
impl<T: VersionedStore + ?Sized> VersionedStore for Arc<T> {
    async fn put(&self, key: &DataKey, value: Value) -> Result<Version> {
        (**self).put(key, value).await
    }

    async fn get_latest(&self, key: &DataKey) -> Result<Option<Version>> {
        (**self).get_latest(key).await
    }

    async fn get_version(&self, key: &DataKey, version: u64) -> Result<Option<Version>> {
        (**self).get_version(key, version).await
    }

    async fn list_keys(&self) -> Result<BTreeSet<DataKey>> {
        (**self).list_keys().await
    }

    async fn delete(&self, key: &DataKey) -> Result<bool> {
        (**self).delete(key).await
    }

    async fn history(&self, key: &DataKey) -> Result<Vec<Version>> {
        (**self).history(key).await
    }
}
