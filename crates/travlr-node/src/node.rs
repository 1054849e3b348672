//! The Node: one registry, one store, one exchange behind a single handle.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use travlr_access::AccessRegistry;
use travlr_core::{DataKey, Did, PeerId};
use travlr_exchange::{ExchangeProtocol, RequestHandle, RequestOutcome, Transport};
use travlr_gateway::{open_gateway, MirroredRegistry, RegistryGateway};
use travlr_identity::{CredentialStore, IdentityProvider, LocalIdentityProvider};
use travlr_store::{open_store, Version, VersionedStore};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Registry as the node sees it: gateway-backed, locally mirrored.
pub type NodeRegistry = MirroredRegistry<Arc<dyn RegistryGateway>>;

/// Exchange as wired by the node.
pub type NodeExchange =
    ExchangeProtocol<Arc<NodeRegistry>, Arc<dyn VersionedStore>, Arc<dyn Transport>>;

/// Credentials kept in the node's own store.
pub type NodeCredentials = CredentialStore<Arc<dyn VersionedStore>, Arc<dyn IdentityProvider>>;

type LoopHandle = JoinHandle<travlr_exchange::Result<()>>;

/// A running Travlr node.
///
/// Authorization decisions go through the gateway; the local
/// [`AccessRegistry`] is a mirror kept for inspection.
pub struct Node {
    config: NodeConfig,
    registry: Arc<NodeRegistry>,
    store: Arc<dyn VersionedStore>,
    exchange: Arc<NodeExchange>,
    credentials: NodeCredentials,
    shutdown: watch::Sender<bool>,
    exchange_loop: Mutex<Option<LoopHandle>>,
}

impl Node {
    /// Open the store and gateway named by `config` and wire them to `transport`.
    pub async fn open(config: NodeConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let store = open_store(&config.store).await?;
        let gateway = open_gateway(&config.gateway)?;
        Ok(Self::with_parts(config, gateway, store, transport))
    }

    /// Wire already-built parts.
    pub fn with_parts(
        config: NodeConfig,
        gateway: Arc<dyn RegistryGateway>,
        store: Arc<dyn VersionedStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let registry = Arc::new(MirroredRegistry::new(gateway, Arc::new(AccessRegistry::new())));
        let exchange = Arc::new(ExchangeProtocol::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            transport,
            config.exchange.to_exchange_config(),
        ));
        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new());
        let credentials = CredentialStore::new(Arc::clone(&store), identity);
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            registry,
            store,
            exchange,
            credentials,
            shutdown,
            exchange_loop: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The gateway-backed registry.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn VersionedStore> {
        &self.store
    }

    pub fn exchange(&self) -> &Arc<NodeExchange> {
        &self.exchange
    }

    /// Credential issuance and storage, backed by the node's store.
    pub fn credentials(&self) -> &NodeCredentials {
        &self.credentials
    }

    pub fn peer_id(&self) -> PeerId {
        self.exchange.transport().local_peer_id()
    }

    pub fn listen_addrs(&self) -> Vec<String> {
        self.exchange.transport().listen_addrs()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Connect the gateway and spawn the inbound exchange loop.
    ///
    /// Calling `start` on a started node does nothing.
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.exchange_loop.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        self.registry.gateway().connect().await?;

        self.shutdown.send_replace(false);
        let rx = self.shutdown.subscribe();
        let exchange = Arc::clone(&self.exchange);
        *slot = Some(tokio::spawn(async move { exchange.run(rx).await }));

        tracing::info!(peer = %self.peer_id(), "node started");
        Ok(())
    }

    /// Stop the exchange loop and disconnect the gateway.
    pub async fn stop(&self) -> Result<()> {
        let Some(handle) = self.exchange_loop.lock().await.take() else {
            return Ok(());
        };

        self.shutdown.send_replace(true);
        let result = handle.await.map_err(|e| NodeError::Task(e.to_string()))?;
        self.registry.gateway().disconnect().await?;

        tracing::info!(peer = %self.peer_id(), "node stopped");
        Ok(result?)
    }

    /// Whether the exchange loop is running.
    pub async fn is_running(&self) -> bool {
        self.exchange_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Peers
    // ─────────────────────────────────────────────────────────────────────────

    /// Dial a peer by address.
    pub async fn connect(&self, addr: &str) -> Result<PeerId> {
        let peer = self.exchange.transport().connect(addr).await?;
        tracing::info!(%peer, addr, "connected to peer");
        Ok(peer)
    }

    /// Publish a request for `key` on behalf of `requester`.
    pub async fn request_data(&self, requester: &Did, key: &DataKey) -> Result<RequestHandle> {
        Ok(self.exchange.request_data(requester, key).await?)
    }

    /// Publish a request and log whatever comes back in the background.
    pub async fn request_data_detached(&self, requester: &Did, key: &DataKey) -> Result<()> {
        let handle = self.request_data(requester, key).await?;
        tokio::spawn(async move {
            let request = handle.request().clone();
            match handle.wait().await {
                RequestOutcome::Served(response) => tracing::info!(
                    requester = %response.requester,
                    key = %response.data_key,
                    "received data"
                ),
                RequestOutcome::TimedOut => tracing::info!(
                    requester = %request.requester,
                    key = %request.data_key,
                    "no data received"
                ),
            }
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Datasets
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a new version of a dataset.
    pub async fn put_dataset(&self, id: &DataKey, data: Value) -> Result<Version> {
        Ok(self.store.put(id, data).await?)
    }

    /// Latest value of a dataset.
    pub async fn get_dataset(&self, id: &DataKey) -> Result<Option<Value>> {
        Ok(self.store.get_latest(id).await?.map(|v| v.value))
    }

    pub async fn list_datasets(&self) -> Result<BTreeSet<DataKey>> {
        Ok(self.store.list_keys().await?)
    }

    /// Delete a dataset. Returns whether it existed.
    pub async fn delete_dataset(&self, id: &DataKey) -> Result<bool> {
        Ok(self.store.delete(id).await?)
    }
}
