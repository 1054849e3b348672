//! Node configuration.
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `TRAVLR_API_PORT` | port of `api.bind` |
//! | `TRAVLR_STORE_KIND` | `store.kind` |
//! | `TRAVLR_DATA_DIR` | `store.data_dir` |
//! | `TRAVLR_GATEWAY_KIND` | `gateway.kind` |
//! | `TRAVLR_GATEWAY_URL` | `gateway.base_url` |
//! | `TRAVLR_LOG` | `logging.level` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use travlr_exchange::ExchangeConfig;
use travlr_gateway::{GatewayConfig, GatewayKind};
use travlr_store::{StoreConfig, StoreKind};

use crate::error::ConfigError;

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Full node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    pub exchange: ExchangeSection,
    pub logging: LoggingConfig,
}

/// `[api]`: the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address, `host:port`.
    pub bind: String,
    /// Also mount the registry service routes.
    pub serve_registry: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            serve_registry: false,
        }
    }
}

impl ApiConfig {
    /// Replace the port of `bind`, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("127.0.0.1");
        self.bind = format!("{}:{}", host, port);
    }
}

/// `[exchange]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSection {
    /// How long a requester waits for a response, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
        }
    }
}

impl ExchangeSection {
    pub fn to_exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `travlr_exchange=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl NodeConfig {
    /// Parse a TOML document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load from `path` (or defaults when `None`) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TRAVLR_API_PORT") {
            let port = value
                .trim()
                .parse::<u16>()
                .map_err(|e| invalid("TRAVLR_API_PORT", &value, e))?;
            self.api.set_port(port);
        }
        if let Some(value) = lookup("TRAVLR_STORE_KIND") {
            self.store.kind = value
                .parse::<StoreKind>()
                .map_err(|e| invalid("TRAVLR_STORE_KIND", &value, e))?;
        }
        if let Some(value) = lookup("TRAVLR_DATA_DIR") {
            self.store.data_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("TRAVLR_GATEWAY_KIND") {
            self.gateway.kind = value
                .parse::<GatewayKind>()
                .map_err(|e| invalid("TRAVLR_GATEWAY_KIND", &value, e))?;
        }
        if let Some(value) = lookup("TRAVLR_GATEWAY_URL") {
            self.gateway.base_url = Some(value);
        }
        if let Some(value) = lookup("TRAVLR_LOG") {
            self.logging.level = value;
        }
        Ok(())
    }
}

fn invalid(var: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidOverride {
        var,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(NodeConfig::parse("").unwrap(), NodeConfig::default());
        assert_eq!(NodeConfig::default().api.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_parse_sections() {
        let config = NodeConfig::parse(
            r#"
            [api]
            bind = "0.0.0.0:8080"
            serve_registry = true

            [store]
            kind = "sqlite"
            data_dir = "/var/lib/travlr"

            [gateway]
            kind = "rest"
            base_url = "http://registry:4000"

            [exchange]
            request_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert!(config.api.serve_registry);
        assert_eq!(config.store.kind, StoreKind::Sqlite);
        assert_eq!(config.store.data_dir, PathBuf::from("/var/lib/travlr"));
        assert_eq!(config.gateway.kind, GatewayKind::Rest);
        assert_eq!(config.gateway.timeout_ms, 10_000);
        assert_eq!(
            config.exchange.to_exchange_config().request_timeout,
            Duration::from_millis(2500)
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let err = NodeConfig::parse("[store]\nkind = \"s3\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let mut config = NodeConfig::default();
        config
            .apply_overrides(env(&[
                ("TRAVLR_API_PORT", "4100"),
                ("TRAVLR_STORE_KIND", "file"),
                ("TRAVLR_DATA_DIR", "/tmp/travlr"),
                ("TRAVLR_GATEWAY_KIND", "rest"),
                ("TRAVLR_GATEWAY_URL", "http://127.0.0.1:4000"),
                ("TRAVLR_LOG", "debug"),
            ]))
            .unwrap();

        assert_eq!(config.api.bind, "127.0.0.1:4100");
        assert_eq!(config.store.kind, StoreKind::File);
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/travlr"));
        assert_eq!(config.gateway.kind, GatewayKind::Rest);
        assert_eq!(config.gateway.base_url.as_deref(), Some("http://127.0.0.1:4000"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_unprefixed_variables_are_ignored() {
        let mut config = NodeConfig::default();
        config
            .apply_overrides(env(&[
                ("API_PORT", "4100"),
                ("DATA_STORE_TYPE", "file"),
                ("BLOCKCHAIN_TYPE", "rest"),
            ]))
            .unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_bad_override_names_the_variable() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_overrides(env(&[("TRAVLR_API_PORT", "eighty")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidOverride { var, value, .. } => {
                assert_eq!(var, "TRAVLR_API_PORT");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_set_port_keeps_host() {
        let mut api = ApiConfig {
            bind: "0.0.0.0:3000".into(),
            serve_registry: false,
        };
        api.set_port(9000);
        assert_eq!(api.bind, "0.0.0.0:9000");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(NodeConfig::from_file(&path).unwrap().logging.level, "warn");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            NodeConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
