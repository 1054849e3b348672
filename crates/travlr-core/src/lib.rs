//! # Travlr Core
//!
//! Identifier types shared by every Travlr crate.
//!
//! This crate contains no I/O, no storage, no networking. It only defines
//! the strong types that keep principals, data keys and peers from being
//! mixed up at compile time.
//!
//! ## Key Types
//!
//! - [`Did`] - Decentralized identifier of a principal (individual or organization)
//! - [`DataKey`] - Key of a versioned data record
//! - [`PeerId`] - Identity of a node on the peer network
//! - [`Timestamp`] - Unix milliseconds, the only time representation used

pub mod time;
pub mod types;

pub use time::{now_millis, Timestamp};
pub use types::{DataKey, Did, PeerId};
