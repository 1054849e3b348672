//! # Travlr Node
//!
//! A node that holds travel records, decides who may read them, and trades
//! them with peers.
//!
//! ## Overview
//!
//! The node wires the component crates together:
//!
//! - **Registry**: [`MirroredRegistry`](travlr_gateway::MirroredRegistry) over
//!   the configured [`RegistryGateway`](travlr_gateway::RegistryGateway)
//! - **Store**: the configured [`VersionedStore`](travlr_store::VersionedStore)
//! - **Exchange**: [`ExchangeProtocol`](travlr_exchange::ExchangeProtocol)
//!   gated by the registry
//! - **Credentials**: a [`CredentialStore`](travlr_identity::CredentialStore)
//!   sharing the node's store
//!
//! and exposes them over HTTP ([`http`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use travlr_exchange::MemoryNetwork;
//! use travlr_node::{http::ApiServer, Node, NodeConfig};
//!
//! async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::load(None)?;
//!     let network = MemoryNetwork::new();
//!     let node = Arc::new(Node::open(config, Arc::new(network.join().await)).await?);
//!
//!     node.start().await?;
//!     ApiServer::bind(Arc::clone(&node))?.run().await?;
//!     node.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod logging;
pub mod node;

pub use config::NodeConfig;
pub use error::{ConfigError, NodeError, Result};
pub use node::{Node, NodeCredentials, NodeExchange, NodeRegistry};

// Re-export component crates
pub use travlr_access as access;
pub use travlr_core as core;
pub use travlr_exchange as exchange;
pub use travlr_gateway as gateway;
pub use travlr_identity as identity;
pub use travlr_store as store;
