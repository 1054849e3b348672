//! Backend selection by typed tag.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;
use crate::traits::VersionedStore;

/// SQLite database file name inside the data directory.
pub const SQLITE_FILE: &str = "travlr.db";

/// Which [`VersionedStore`] backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// [`MemoryStore`]: full history, nothing persisted.
    #[default]
    Memory,
    /// [`FileStore`]: one `<key>.json` per key, latest value persisted.
    File,
    /// [`SqliteStore`]: full history persisted.
    Sqlite,
}

impl StoreKind {
    /// The configuration tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::File => "file",
            StoreKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            "sqlite" => Ok(StoreKind::Sqlite),
            _ => Err(StoreError::UnknownKind(s.to_owned())),
        }
    }
}

/// Store configuration (the `[store]` section of the node config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend to open.
    pub kind: StoreKind,

    /// Directory for the file and SQLite backends.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Open the backend named by `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VersionedStore>> {
    let store: Arc<dyn VersionedStore> = match config.kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => Arc::new(FileStore::open(&config.data_dir).await?),
        StoreKind::Sqlite => {
            tokio::fs::create_dir_all(&config.data_dir).await?;
            Arc::new(SqliteStore::open(config.data_dir.join(SQLITE_FILE))?)
        }
    };

    tracing::info!(kind = %config.kind, dir = %config.data_dir.display(), "opened store");
    Ok(store)
}
