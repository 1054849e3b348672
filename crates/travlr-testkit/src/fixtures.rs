//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use travlr_access::{AccessRegistry, Role};
use travlr_core::{DataKey, Did};
use travlr_exchange::{ExchangeConfig, ExchangeProtocol, MemoryNetwork, MemoryTransport, Transport};
use travlr_store::MemoryStore;

/// Exchange over in-memory parts sharing one registry.
pub type TestExchange = ExchangeProtocol<Arc<AccessRegistry>, Arc<MemoryStore>, MemoryTransport>;

/// Request timeout used by fixtures. Short, since tests wait it out.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(250);

/// The organization, user and outsider most scenarios need.
#[derive(Debug, Clone)]
pub struct Principals {
    pub org: Did,
    pub user: Did,
    pub outsider: Did,
    pub key: DataKey,
}

impl Principals {
    pub fn new() -> Self {
        Self {
            org: Did::from("did:example:org1"),
            user: Did::from("did:example:user1"),
            outsider: Did::from("did:example:mallory"),
            key: DataKey::from("personal_info"),
        }
    }

    /// Register the organization and the two individuals.
    pub fn register(&self, registry: &AccessRegistry) {
        registry.register_principal(&self.org, Role::Organization);
        registry.register_principal(&self.user, Role::Individual);
        registry.register_principal(&self.outsider, Role::Individual);
    }
}

impl Default for Principals {
    fn default() -> Self {
        Self::new()
    }
}

/// One peer of a [`TestNetwork`].
pub struct TestPeer {
    pub store: Arc<MemoryStore>,
    pub exchange: TestExchange,
}

/// A fully connected in-memory network of exchange peers.
///
/// All peers consult the same registry.
pub struct TestNetwork {
    pub network: Arc<MemoryNetwork>,
    pub registry: Arc<AccessRegistry>,
    pub principals: Principals,
    pub peers: Vec<TestPeer>,
}

impl TestNetwork {
    /// Create `count` peers and connect every pair.
    pub async fn new(count: usize) -> Self {
        let network = MemoryNetwork::new();
        let registry = Arc::new(AccessRegistry::new());
        let config = ExchangeConfig {
            request_timeout: TEST_TIMEOUT,
        };

        let mut transports = Vec::with_capacity(count);
        for _ in 0..count {
            transports.push(network.join().await);
        }
        for (i, a) in transports.iter().enumerate() {
            for b in &transports[i + 1..] {
                a.connect(&b.listen_addrs()[0])
                    .await
                    .expect("in-memory peers can always connect");
            }
        }

        let peers = transports
            .into_iter()
            .map(|transport| {
                let store = Arc::new(MemoryStore::new());
                let exchange = ExchangeProtocol::new(
                    Arc::clone(&registry),
                    Arc::clone(&store),
                    transport,
                    config.clone(),
                );
                TestPeer { store, exchange }
            })
            .collect();

        Self {
            network,
            registry,
            principals: Principals::new(),
            peers,
        }
    }

    /// Let every peer handle whatever is queued, until the network is quiet.
    pub async fn settle(&self) {
        loop {
            let mut progressed = false;
            for peer in &self.peers {
                while peer
                    .exchange
                    .process_next(Duration::from_millis(20))
                    .await
                    .expect("in-memory transport stays open")
                {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use travlr_exchange::RequestOutcome;
    use travlr_store::VersionedStore;

    #[tokio::test]
    async fn test_every_pair_is_connected() {
        let net = TestNetwork::new(3).await;
        for peer in &net.peers {
            let connected = peer.exchange.transport().connected_peers().await.unwrap();
            assert_eq!(connected.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_only_granted_principal_is_served() {
        let net = TestNetwork::new(2).await;
        let p = &net.principals;
        p.register(&net.registry);
        net.registry.grant_access(&p.org, &p.user, &p.key, None);
        net.peers[0].store.put(&p.key, json!({"passport": "X1"})).await.unwrap();

        let reader = &net.peers[1].exchange;
        let granted = reader.request_data(&p.user, &p.key).await.unwrap();
        let denied = reader.request_data(&p.outsider, &p.key).await.unwrap();
        net.settle().await;

        assert!(matches!(granted.wait().await, RequestOutcome::Served(_)));
        assert_eq!(denied.wait().await, RequestOutcome::TimedOut);
    }
}
