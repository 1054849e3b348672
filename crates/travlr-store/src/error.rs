//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// An absent key or version is never an error; lookups return `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the file backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key cannot be stored by this backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Unrecognized backend tag.
    #[error("unknown store kind: {0:?}")]
    UnknownKind(String),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A blocking database task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
