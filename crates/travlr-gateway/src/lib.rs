//! # Travlr Gateway
//!
//! Pluggable systems of record for the access registry.
//!
//! ## Overview
//!
//! A [`RegistryGateway`] is the remote equivalent of the registry operations:
//! it accepts writes (returning a [`TransactionId`]) and answers access and
//! delegation checks. [`MirroredRegistry`] puts a local
//! [`AccessRegistry`](travlr_access::AccessRegistry) in front of one as a
//! cache that is refreshed from, never trusted over, the gateway.
//!
//! ## Key Types
//!
//! - [`RegistryGateway`] - The async trait every backend implements
//! - [`LocalGateway`] - An in-process registry as the system of record
//! - [`RestGateway`] - A client for the registry service routes in [`wire::routes`]
//! - [`GatewayKind`] / [`open_gateway`] - Backend selection from configuration
//! - [`MirroredRegistry`] - Gateway-backed [`Authorizer`](travlr_access::Authorizer)

pub mod error;
pub mod kind;
pub mod local;
pub mod mirror;
pub mod rest;
pub mod traits;
pub mod wire;

pub use error::{GatewayError, Result};
pub use kind::{open_gateway, GatewayConfig, GatewayKind};
pub use local::LocalGateway;
pub use mirror::MirroredRegistry;
pub use rest::RestGateway;
pub use traits::RegistryGateway;
pub use wire::TransactionId;
