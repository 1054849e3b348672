//! # Travlr Exchange
//!
//! Access-gated data exchange between peers.
//!
//! ## Overview
//!
//! A requester publishes a [`DataRequest`] on the `data-request` topic. Every
//! peer that receives it asks its [`Authorizer`](travlr_access::Authorizer)
//! whether the requester may read the key. If so, and the record exists, the
//! latest version is published back on `data-response`. If not, nothing is
//! sent: absence of a response is the only denial signal, and a denial is
//! indistinguishable from a missing record.
//!
//! Sending a record directly to one peer goes through the same access check,
//! but a denial there is an explicit [`ExchangeError::AccessDenied`], since
//! the caller is the data owner.
//!
//! ## Message Flow
//!
//! ```text
//! Requester                           Holder
//!   |-------- data-request ---------->|  has_access? get_latest?
//!   |<------- data-response ----------|  (only if both)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use travlr_access::AccessRegistry;
//! use travlr_core::{DataKey, Did};
//! use travlr_exchange::{ExchangeConfig, ExchangeProtocol, MemoryNetwork, RequestOutcome};
//! use travlr_store::MemoryStore;
//!
//! async fn example() -> travlr_exchange::Result<()> {
//!     let network = MemoryNetwork::new();
//!     let transport = network.join().await;
//!
//!     let exchange = ExchangeProtocol::new(
//!         Arc::new(AccessRegistry::new()),
//!         Arc::new(MemoryStore::new()),
//!         transport,
//!         ExchangeConfig::default(),
//!     );
//!
//!     let handle = exchange
//!         .request_data(&Did::from("did:user1"), &DataKey::from("personal_info"))
//!         .await?;
//!     if let RequestOutcome::Served(response) = handle.wait().await {
//!         println!("{}", response.data);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod messages;
pub mod protocol;
pub mod transport;

pub use error::{ExchangeError, Result};
pub use messages::{limits, DataRequest, DataResponse, Topic};
pub use protocol::{
    ExchangeConfig, ExchangeProtocol, ExchangeStats, RequestHandle, RequestOutcome, RequestState,
    ServeOutcome,
};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, Inbound, Transport};
