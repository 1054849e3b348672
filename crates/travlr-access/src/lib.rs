//! # Travlr Access
//!
//! The authorization registry: who may read which data key, and for how long.
//!
//! ## Overview
//!
//! The registry is the single source of truth for:
//!
//! - **Principals**: DIDs registered with a [`Role`] (individual or organization)
//! - **Grants**: time-bounded read access to one data key for one grantee
//! - **Delegation edges**: an organization's intent to let another principal
//!   act on its own access to a key
//!
//! It is pure logic behind one lock. There is no I/O, and no operation fails:
//! unknown principals and keys simply have no access.
//!
//! ## Expiry
//!
//! Expiry is lazy. An expired grant is not removed, it is masked at query time
//! by comparing its expiration against the clock. The record stays inspectable
//! through [`AccessRegistry::grant`] until [`AccessRegistry::purge_expired`] is
//! called explicitly.
//!
//! ## Usage
//!
//! ```rust
//! use travlr_access::{AccessRegistry, Role};
//! use travlr_core::{now_millis, DataKey, Did};
//!
//! let registry = AccessRegistry::new();
//! let org = Did::from("did:example:org1");
//! let user = Did::from("did:example:user1");
//! let key = DataKey::from("personal_info");
//!
//! registry.register_principal(&org, Role::Organization);
//! registry.register_principal(&user, Role::Individual);
//!
//! registry.grant_access(&org, &user, &key, Some(now_millis() + 86_400_000));
//! assert!(registry.has_access(&user, &key));
//!
//! registry.revoke_access(&org, &user, &key);
//! assert!(!registry.has_access(&user, &key));
//! ```

pub mod authorizer;
pub mod error;
pub mod grant;
pub mod registry;

pub use authorizer::Authorizer;
pub use error::{AccessError, Result};
pub use grant::{DelegationEdge, Grant, Role};
pub use registry::AccessRegistry;
