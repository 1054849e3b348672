//! Error types for the exchange module.

use thiserror::Error;

use travlr_core::{DataKey, Did};

/// Errors that can occur during exchange operations.
///
/// A denied or unanswerable broadcast request is not an error; it resolves
/// to a dropped or timed-out outcome.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Direct send refused: the recipient has no access to the key.
    #[error("access denied: {recipient} may not read {key}")]
    AccessDenied { recipient: Did, key: DataKey },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer address could not be parsed.
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    /// An inbound payload could not be decoded.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An outbound message could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] travlr_store::StoreError),

    /// The authorizer could not answer.
    #[error("access check failed: {0}")]
    Access(#[from] travlr_access::AccessError),
}

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;
