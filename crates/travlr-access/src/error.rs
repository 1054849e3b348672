//! Error types for the access module.

use thiserror::Error;

/// Errors that can occur while answering an authorization query.
///
/// The local registry never produces these. They come from authorizers
/// backed by a remote system of record.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The remote system of record failed or could not be reached.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// Result type for authorization queries.
pub type Result<T> = std::result::Result<T, AccessError>;
