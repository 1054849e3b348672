//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unix time in milliseconds.
pub type Timestamp = i64;

/// Get current time in milliseconds.
///
/// A clock set before the epoch reads as 0.
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}
