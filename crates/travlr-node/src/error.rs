//! Error types for the node.

use std::path::PathBuf;

use thiserror::Error;
use travlr_access::AccessError;
use travlr_exchange::ExchangeError;
use travlr_gateway::GatewayError;
use travlr_identity::IdentityError;
use travlr_store::StoreError;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`NodeConfig`](crate::NodeConfig).
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidOverride {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Exchange error.
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// Registry gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Access registry error.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// Identity or credential error.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// I/O error, e.g. binding the HTTP listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange loop task failed.
    #[error("task error: {0}")]
    Task(String),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
