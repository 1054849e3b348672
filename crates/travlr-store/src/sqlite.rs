//! SQLite implementation of the VersionedStore trait.
//!
//! Persists full version history. Uses rusqlite with bundled SQLite, wrapped
//! in async via `tokio::task::spawn_blocking`.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use travlr_core::{now_millis, DataKey, Timestamp};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Version, VersionedStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, running migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

struct Row {
    value: String,
    timestamp: Timestamp,
    version: i64,
}

impl Row {
    fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            value: row.get("value")?,
            timestamp: row.get("timestamp")?,
            version: row.get("version")?,
        })
    }

    fn decode(self) -> Result<Version> {
        Ok(Version {
            value: serde_json::from_str(&self.value)?,
            timestamp: self.timestamp,
            version: self.version as u64,
        })
    }
}

#[async_trait]
impl VersionedStore for SqliteStore {
    async fn put(&self, key: &DataKey, value: Value) -> Result<Version> {
        let key = key.clone();
        let encoded = serde_json::to_string(&value)?;

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(version) + 1, 0) FROM versions WHERE data_key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )?;
            let timestamp = now_millis();

            tx.execute(
                "INSERT INTO versions (data_key, version, value, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![key.as_str(), next, encoded, timestamp],
            )?;
            tx.commit()?;

            Ok(Version {
                value,
                timestamp,
                version: next as u64,
            })
        })
        .await
    }

    async fn get_latest(&self, key: &DataKey) -> Result<Option<Version>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value, timestamp, version FROM versions
                 WHERE data_key = ?1 ORDER BY version DESC LIMIT 1",
                params![key.as_str()],
                Row::from_sql,
            )
            .optional()?
            .map(Row::decode)
            .transpose()
        })
        .await
    }

    async fn get_version(&self, key: &DataKey, version: u64) -> Result<Option<Version>> {
        let Ok(version) = i64::try_from(version) else {
            return Ok(None);
        };
        let key = key.clone();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value, timestamp, version FROM versions
                 WHERE data_key = ?1 AND version = ?2",
                params![key.as_str(), version],
                Row::from_sql,
            )
            .optional()?
            .map(Row::decode)
            .transpose()
        })
        .await
    }

    async fn list_keys(&self) -> Result<BTreeSet<DataKey>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT data_key FROM versions")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|k| k.map(DataKey::from))
                .collect::<rusqlite::Result<BTreeSet<_>>>()?;
            Ok(keys)
        })
        .await
    }

    async fn delete(&self, key: &DataKey) -> Result<bool> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM versions WHERE data_key = ?1",
                params![key.as_str()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn history(&self, key: &DataKey) -> Result<Vec<Version>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT value, timestamp, version FROM versions
                 WHERE data_key = ?1 ORDER BY version ASC",
            )?;
            let rows = stmt
                .query_map(params![key.as_str()], Row::from_sql)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(Row::decode).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_versions() {
        let store = SqliteStore::open_memory().unwrap();
        let key = DataKey::from("k");

        store.put(&key, json!({"v": 1})).await.unwrap();
        store.put(&key, json!({"v": 2})).await.unwrap();

        let latest = store.get_latest(&key).await.unwrap().unwrap();
        assert_eq!(latest.value, json!({"v": 2}));
        assert_eq!(latest.version, 1);

        let first = store.get_version(&key, 0).await.unwrap().unwrap();
        assert_eq!(first.value, json!({"v": 1}));
        assert!(store.get_version(&key, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let key = DataKey::from("k");

        {
            let store = SqliteStore::open(&path).unwrap();
            for i in 0..3 {
                store.put(&key, json!(i)).await.unwrap();
            }
        }

        let store = SqliteStore::open(&path).unwrap();
        let history = store.history(&key).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].value, json!(2));
        assert_eq!(history[2].version, 2);

        let next = store.put(&key, json!(3)).await.unwrap();
        assert_eq!(next.version, 3);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = SqliteStore::open_memory().unwrap();
        store.put(&DataKey::from("a"), json!(null)).await.unwrap();
        store.put(&DataKey::from("a"), json!(null)).await.unwrap();
        store.put(&DataKey::from("b"), json!(null)).await.unwrap();

        assert_eq!(store.list_keys().await.unwrap().len(), 2);
        assert!(store.delete(&DataKey::from("a")).await.unwrap());
        assert!(!store.delete(&DataKey::from("a")).await.unwrap());

        let keys: Vec<_> = store.list_keys().await.unwrap().into_iter().collect();
        assert_eq!(keys, vec![DataKey::from("b")]);
    }

    #[tokio::test]
    async fn test_concurrent_puts_stay_dense() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let key = DataKey::from("k");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move { store.put(&key, json!(i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let versions: Vec<u64> = store
            .history(&key)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(versions, (0..16).collect::<Vec<_>>());
    }
}
