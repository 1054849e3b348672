//! In-memory implementation of the VersionedStore trait.
//!
//! Keeps full history for the lifetime of the store, with no persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use travlr_core::{now_millis, DataKey};

use crate::error::{Result, StoreError};
use crate::traits::{Version, VersionedStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<DataKey, Vec<Version>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<DataKey, Vec<Version>>>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<DataKey, Vec<Version>>>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl VersionedStore for MemoryStore {
    async fn put(&self, key: &DataKey, value: Value) -> Result<Version> {
        let mut inner = self.write()?;
        let versions = inner.entry(key.clone()).or_default();

        let version = Version {
            value,
            timestamp: now_millis(),
            version: versions.len() as u64,
        };
        versions.push(version.clone());
        Ok(version)
    }

    async fn get_latest(&self, key: &DataKey) -> Result<Option<Version>> {
        Ok(self.read()?.get(key).and_then(|v| v.last()).cloned())
    }

    async fn get_version(&self, key: &DataKey, version: u64) -> Result<Option<Version>> {
        let inner = self.read()?;
        let Ok(index) = usize::try_from(version) else {
            return Ok(None);
        };
        Ok(inner.get(key).and_then(|v| v.get(index)).cloned())
    }

    async fn list_keys(&self) -> Result<BTreeSet<DataKey>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn delete(&self, key: &DataKey) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn history(&self, key: &DataKey) -> Result<Vec<Version>> {
        Ok(self.read()?.get(key).cloned().unwrap_or_default())
    }
}
