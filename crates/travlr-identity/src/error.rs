//! Error types for the identity module.

use thiserror::Error;

use travlr_core::Did;
use travlr_store::StoreError;

/// Errors from identity and credential operations.
///
/// A credential that fails verification is not an error; verification
/// answers `false`.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No signing key is held for this DID.
    #[error("unknown identity: {0}")]
    UnknownIdentity(Did),

    /// The claims cannot be placed in a credential.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// A credential could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
