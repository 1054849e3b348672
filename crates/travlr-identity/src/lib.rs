//! # Travlr Identity
//!
//! Decentralized identifiers and verifiable credentials for principals.
//!
//! ## Overview
//!
//! An [`IdentityProvider`] creates DIDs and signs claims about other DIDs.
//! The bundled [`LocalIdentityProvider`] uses Ed25519 keys and DIDs of the
//! form `did:travlr:<hex public key>`, so anyone can check a [`Credential`]
//! from the issuer DID alone. [`CredentialStore`] keeps credentials next to
//! ordinary records in a [`VersionedStore`](travlr_store::VersionedStore),
//! under `vc:<id>` keys.
//!
//! Credentials are informational. Authorization decisions are made by the
//! access registry, never by presenting a credential.
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::{json, Map};
//! use travlr_identity::{CredentialStore, IdentityProvider, LocalIdentityProvider};
//! use travlr_store::MemoryStore;
//!
//! async fn example() -> travlr_identity::Result<()> {
//!     let credentials = CredentialStore::new(MemoryStore::new(), LocalIdentityProvider::new());
//!     let org = credentials.provider().create_identity().await?;
//!     let user = credentials.provider().create_identity().await?;
//!
//!     let mut claims = Map::new();
//!     claims.insert("dataKey".into(), json!("personal_info"));
//!
//!     let vc = credentials.generate(&org.did, &user.did, claims).await?;
//!     assert!(credentials.verify(&vc).await?);
//!     assert_eq!(credentials.list().await?.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod credential;
pub mod error;
pub mod local;
pub mod provider;
pub mod store;

pub use credential::{Credential, CredentialSubject, Identity, Proof};
pub use error::{IdentityError, Result};
pub use local::LocalIdentityProvider;
pub use provider::IdentityProvider;
pub use store::{credential_key, CredentialStore, CREDENTIAL_PREFIX};
