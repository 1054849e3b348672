//! Backend selection by typed tag.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use travlr_access::AccessRegistry;

use crate::error::{GatewayError, Result};
use crate::local::LocalGateway;
use crate::rest::RestGateway;
use crate::traits::RegistryGateway;

/// Which [`RegistryGateway`] backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// [`LocalGateway`]: an in-process registry is the system of record.
    #[default]
    Local,
    /// [`RestGateway`]: a remote registry service is the system of record.
    Rest,
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatewayKind::Local => "local",
            GatewayKind::Rest => "rest",
        })
    }
}

impl FromStr for GatewayKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(GatewayKind::Local),
            "rest" => Ok(GatewayKind::Rest),
            _ => Err(GatewayError::UnknownKind(s.to_owned())),
        }
    }
}

/// Gateway configuration (the `[gateway]` section of the node config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Backend to use.
    pub kind: GatewayKind,

    /// Registry service URL. Required for [`GatewayKind::Rest`].
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Local,
            base_url: None,
            timeout_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Build the backend named by `config`.
///
/// A local gateway gets a fresh registry of its own.
pub fn open_gateway(config: &GatewayConfig) -> Result<Arc<dyn RegistryGateway>> {
    let gateway: Arc<dyn RegistryGateway> = match config.kind {
        GatewayKind::Local => Arc::new(LocalGateway::new(Arc::new(AccessRegistry::new()))),
        GatewayKind::Rest => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| GatewayError::Config("rest gateway needs base_url".into()))?;
            Arc::new(RestGateway::new(base_url, config.timeout())?)
        }
    };

    tracing::info!(kind = %config.kind, "opened registry gateway");
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("local".parse::<GatewayKind>().unwrap(), GatewayKind::Local);
        assert_eq!("REST".parse::<GatewayKind>().unwrap(), GatewayKind::Rest);
        assert!("ethereum".parse::<GatewayKind>().is_err());
    }

    #[test]
    fn test_rest_requires_base_url() {
        let config = GatewayConfig {
            kind: GatewayKind::Rest,
            ..GatewayConfig::default()
        };
        assert!(matches!(open_gateway(&config), Err(GatewayError::Config(_))));

        let config = GatewayConfig {
            kind: GatewayKind::Rest,
            base_url: Some("http://127.0.0.1:4000".into()),
            ..GatewayConfig::default()
        };
        assert!(open_gateway(&config).is_ok());
    }
}
