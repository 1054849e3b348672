//! # Travlr Testkit
//!
//! Testing utilities for Travlr crates.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: canned principals and fully connected in-memory exchange networks
//! - **Generators**: proptest strategies for identifiers, values and registry operations
//!
//! ## Test Fixtures
//!
//! ```rust
//! use travlr_testkit::fixtures::TestNetwork;
//!
//! # async fn example() {
//! let net = TestNetwork::new(2).await;
//! net.principals.register(&net.registry);
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use travlr_testkit::generators::registry_ops;
//!
//! proptest! {
//!     #[test]
//!     fn never_panics(ops in registry_ops(64)) {
//!         let registry = travlr_access::AccessRegistry::new();
//!         for op in &ops {
//!             op.apply(&registry);
//!         }
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{Principals, TestNetwork, TestPeer};
