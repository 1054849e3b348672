//! File-backed implementation of the VersionedStore trait.
//!
//! One file per key, `<key>.json`, holding the latest value only. Version
//! history is kept in memory for the lifetime of the process; after a
//! reopen every key restarts at its persisted value as version 0.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use travlr_core::{now_millis, DataKey, Timestamp};

use crate::error::{Result, StoreError};
use crate::traits::{Version, VersionedStore};

const EXTENSION: &str = "json";

/// File-backed store.
///
/// Writes go through a temporary file and a rename, so a crash never leaves a
/// half-written record behind.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    history: RwLock<HashMap<DataKey, Vec<Version>>>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed and
    /// loading every `<key>.json` it contains.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let mut history = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match load_record(&path).await {
                Ok(version) => {
                    history.insert(DataKey::from(stem), vec![version]);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                }
            }
        }

        tracing::debug!(dir = %dir.display(), keys = history.len(), "opened file store");
        Ok(Self {
            dir,
            history: RwLock::new(history),
        })
    }

    /// The directory records are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &DataKey) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }
}

/// Reject keys that cannot map to a single file inside the store directory.
fn validate_key(key: &DataKey) -> Result<()> {
    let raw = key.as_str();
    let invalid = raw.is_empty()
        || raw == "."
        || raw.contains("..")
        || raw.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StoreError::InvalidKey(raw.to_owned()));
    }
    Ok(())
}

async fn load_record(path: &Path) -> Result<Version> {
    let bytes = tokio::fs::read(path).await?;
    let value: Value = serde_json::from_slice(&bytes)?;

    let timestamp = tokio::fs::metadata(path)
        .await?
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_else(now_millis);

    Ok(Version {
        value,
        timestamp,
        version: 0,
    })
}

#[async_trait]
impl VersionedStore for FileStore {
    async fn put(&self, key: &DataKey, value: Value) -> Result<Version> {
        let path = self.path_for(key)?;
        let encoded = serde_json::to_vec_pretty(&value)?;

        // Held across the write so concurrent puts to the same key land in
        // the same order on disk and in memory.
        let mut history = self.history.write().await;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &encoded).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let versions = history.entry(key.clone()).or_default();
        let version = Version {
            value,
            timestamp: now_millis(),
            version: versions.len() as u64,
        };
        versions.push(version.clone());
        Ok(version)
    }

    // Reads never validate: a key that cannot be stored is simply absent.
    async fn get_latest(&self, key: &DataKey) -> Result<Option<Version>> {
        Ok(self.history.read().await.get(key).and_then(|v| v.last()).cloned())
    }

    async fn get_version(&self, key: &DataKey, version: u64) -> Result<Option<Version>> {
        let Ok(index) = usize::try_from(version) else {
            return Ok(None);
        };
        Ok(self.history.read().await.get(key).and_then(|v| v.get(index)).cloned())
    }

    async fn list_keys(&self) -> Result<BTreeSet<DataKey>> {
        Ok(self.history.read().await.keys().cloned().collect())
    }

    async fn delete(&self, key: &DataKey) -> Result<bool> {
        let path = self.path_for(key)?;
        let mut history = self.history.write().await;

        let removed_file = match tokio::fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        let removed_history = history.remove(key).is_some();

        Ok(removed_file || removed_history)
    }

    async fn history(&self, key: &DataKey) -> Result<Vec<Version>> {
        Ok(self.history.read().await.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_writes_latest_value_to_disk() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let key = DataKey::from("personal_info");

        store.put(&key, json!({"name": "a"})).await.unwrap();
        store.put(&key, json!({"name": "b"})).await.unwrap();

        let on_disk = std::fs::read(dir.path().join("personal_info.json")).unwrap();
        let value: Value = serde_json::from_slice(&on_disk).unwrap();
        assert_eq!(value, json!({"name": "b"}));

        // Full history is available in-process.
        let history = store.history(&key).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, json!({"name": "a"}));
        assert_eq!(history[1].version, 1);
    }

    #[tokio::test]
    async fn test_reopen_restarts_history_at_latest() {
        let dir = tempdir().unwrap();
        let key = DataKey::from("k");

        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.put(&key, json!(1)).await.unwrap();
            store.put(&key, json!(2)).await.unwrap();
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        let latest = store.get_latest(&key).await.unwrap().unwrap();
        assert_eq!(latest.value, json!(2));
        assert_eq!(latest.version, 0);
        assert!(store.get_version(&key, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keys_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("good.json"), b"[1,2]").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        let keys: Vec<_> = store.list_keys().await.unwrap().into_iter().collect();
        assert_eq!(keys, vec![DataKey::from("good")]);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let key = DataKey::from("k");

        store.put(&key, json!(true)).await.unwrap();
        assert!(store.delete(&key).await.unwrap());
        assert!(!dir.path().join("k.json").exists());
        assert!(store.get_latest(&key).await.unwrap().is_none());

        // Deleting again is not an error.
        assert!(!store.delete(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        for bad in ["", "../escape", "a/b", "a\\b", "."] {
            let err = store.put(&DataKey::from(bad), json!(1)).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {:?}", bad);
            let err = store.delete(&DataKey::from(bad)).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_reads_of_path_like_keys_are_absent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        for bad in ["..x", "../escape", "a/b"] {
            let key = DataKey::from(bad);
            assert!(store.get_latest(&key).await.unwrap().is_none(), "key {:?}", bad);
            assert!(store.get_version(&key, 0).await.unwrap().is_none(), "key {:?}", bad);
            assert!(store.history(&key).await.unwrap().is_empty(), "key {:?}", bad);
        }
    }
}
