//! Error types for the gateway module.

use thiserror::Error;

use travlr_access::AccessError;

/// Errors from a registry gateway.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry service answered with a non-success status.
    #[error("registry service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A URL could not be built from the configured base.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Unrecognized backend tag.
    #[error("unknown gateway kind: {0:?}")]
    UnknownKind(String),

    /// The gateway configuration is incomplete.
    #[error("gateway configuration error: {0}")]
    Config(String),
}

impl From<GatewayError> for AccessError {
    fn from(err: GatewayError) -> Self {
        AccessError::ExternalService(err.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
