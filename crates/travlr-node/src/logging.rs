//! Tracing setup for the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Noisy dependencies held at `warn` unless `RUST_LOG` says otherwise.
const QUIET: &str = "actix_server=warn,hyper=warn,reqwest=warn";

/// Build the filter: `RUST_LOG` if set, else `level`.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{},{}", level, QUIET)))
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed, e.g. by a test harness.
pub fn init(level: &str) -> bool {
    let layer = fmt::layer().with_target(false).with_filter(filter(level));
    tracing_subscriber::registry().with(layer).try_init().is_ok()
}
