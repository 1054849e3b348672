//! # Travlr Store
//!
//! Append-only, multi-version record storage.
//!
//! ## Overview
//!
//! Every `put` appends a new [`Version`] numbered by its position in the key's
//! history. Versions are never mutated; `delete` drops a key's whole history
//! and is reserved for dataset lifecycle management. The store makes no
//! authorization decisions.
//!
//! ## Key Types
//!
//! - [`VersionedStore`] - The async trait for all storage operations
//! - [`MemoryStore`] - Full history, in memory
//! - [`FileStore`] - `<key>.json` per key, latest value persisted
//! - [`SqliteStore`] - Full history persisted in SQLite
//! - [`StoreKind`] / [`open_store`] - Backend selection from configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use serde_json::json;
//! use travlr_core::DataKey;
//! use travlr_store::{SqliteStore, VersionedStore};
//!
//! async fn example() -> travlr_store::Result<()> {
//!     let store = SqliteStore::open("travlr.db")?;
//!     let key = DataKey::from("personal_info");
//!
//!     store.put(&key, json!({"name": "Ada"})).await?;
//!     store.put(&key, json!({"name": "Ada L."})).await?;
//!
//!     let latest = store.get_latest(&key).await?;
//!     assert_eq!(latest.map(|v| v.version), Some(1));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file;
pub mod kind;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use kind::{open_store, StoreConfig, StoreKind};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Version, VersionedStore};
