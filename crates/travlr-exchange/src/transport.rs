//! Transport abstraction for the data exchange.
//!
//! The transport finds peers, dials them and carries topic-tagged payloads.
//! It gives no delivery guarantee: `publish` is fire-and-forget, and a
//! payload for a peer whose inbox is full is dropped rather than waited on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use travlr_core::PeerId;

use crate::error::Result;
use crate::messages::Topic;

/// A payload received from a peer.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// The sending peer.
    pub from: PeerId,
    /// The topic it was published or sent on.
    pub topic: Topic,
    /// The raw payload.
    pub payload: Bytes,
}

/// Transport trait for publishing and receiving exchange messages.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a payload on a topic to every connected peer.
    async fn publish(&self, topic: Topic, payload: Bytes) -> Result<()>;

    /// Send a payload to one connected peer.
    async fn send(&self, peer: &PeerId, topic: Topic, payload: Bytes) -> Result<()>;

    /// Receive the next payload from any peer.
    async fn recv(&self) -> Result<Inbound>;

    /// Receive with timeout. Returns `None` if the timeout expires first.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Inbound>>;

    /// Get the local peer's identity.
    fn local_peer_id(&self) -> PeerId;

    /// Addresses other peers can dial to reach this one.
    fn listen_addrs(&self) -> Vec<String>;

    /// Dial a peer by address. Returns the connected peer's identity.
    async fn connect(&self, addr: &str) -> Result<PeerId>;

    /// List currently connected peers.
    async fn connected_peers(&self) -> Result<Vec<PeerId>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn publish(&self, topic: Topic, payload: Bytes) -> Result<()> {
        (**self).publish(topic, payload).await
    }

    async fn send(&self, peer: &PeerId, topic: Topic, payload: Bytes) -> Result<()> {
        (**self).send(peer, topic, payload).await
    }

    async fn recv(&self) -> Result<Inbound> {
        (**self).recv().await
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Inbound>> {
        (**self).recv_timeout(timeout).await
    }

    fn local_peer_id(&self) -> PeerId {
        (**self).local_peer_id()
    }

    fn listen_addrs(&self) -> Vec<String> {
        (**self).listen_addrs()
    }

    async fn connect(&self, addr: &str) -> Result<PeerId> {
        (**self).connect(addr).await
    }

    async fn connected_peers(&self) -> Result<Vec<PeerId>> {
        (**self).connected_peers().await
    }
}

/// An in-process transport.
///
/// Peers join a shared [`MemoryNetwork`] and are addressed as
/// `/memory/<peer-hex>`. Connections are symmetric.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::{mpsc, Mutex, RwLock};

    use crate::error::ExchangeError;

    /// Address prefix for in-memory peers.
    pub const ADDR_PREFIX: &str = "/memory/";

    /// Payloads a peer may have queued before further deliveries are dropped.
    pub const INBOX_CAPACITY: usize = 1000;

    /// Format the address of an in-memory peer.
    pub fn memory_addr(peer: &PeerId) -> String {
        format!("{}{}", ADDR_PREFIX, peer.to_hex())
    }

    /// Parse an address produced by [`memory_addr`].
    pub fn parse_memory_addr(addr: &str) -> Result<PeerId> {
        addr.strip_prefix(ADDR_PREFIX)
            .and_then(|hex| PeerId::from_hex(hex).ok())
            .ok_or_else(|| ExchangeError::InvalidAddress(addr.to_owned()))
    }

    #[derive(Debug)]
    struct Envelope {
        from: PeerId,
        topic: Topic,
        payload: Bytes,
    }

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Inbox of each joined peer.
        senders: RwLock<HashMap<PeerId, mpsc::Sender<Envelope>>>,
        /// Established connections, recorded on both ends.
        links: RwLock<HashMap<PeerId, HashSet<PeerId>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport for `peer_id` attached to this network.
        pub async fn create_transport(self: &Arc<Self>, peer_id: PeerId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            self.senders.write().await.insert(peer_id, tx);

            MemoryTransport {
                peer_id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
            }
        }

        /// Create a transport with a random identity.
        pub async fn join(self: &Arc<Self>) -> MemoryTransport {
            self.create_transport(PeerId::random()).await
        }

        async fn peers_of(&self, peer: &PeerId) -> Vec<PeerId> {
            self.links
                .read()
                .await
                .get(peer)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        }

        async fn deliver(&self, to: &PeerId, envelope: Envelope) -> Result<()> {
            let sender = self
                .senders
                .read()
                .await
                .get(to)
                .cloned()
                .ok_or_else(|| ExchangeError::Transport(format!("peer not found: {}", to)))?;

            sender.try_send(envelope).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    ExchangeError::Transport(format!("inbox full, dropped payload for {}", to))
                }
                mpsc::error::TrySendError::Closed(_) => {
                    ExchangeError::Transport(format!("peer disconnected: {}", to))
                }
            })
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        peer_id: PeerId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Envelope>>,
    }

    impl MemoryTransport {
        fn unpack(envelope: Envelope) -> Inbound {
            Inbound {
                from: envelope.from,
                topic: envelope.topic,
                payload: envelope.payload,
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn publish(&self, topic: Topic, payload: Bytes) -> Result<()> {
            let peers = self.network.peers_of(&self.peer_id).await;
            if peers.is_empty() {
                tracing::debug!(%topic, "publish with no connected peers");
            }

            for peer in peers {
                let envelope = Envelope {
                    from: self.peer_id,
                    topic,
                    payload: payload.clone(),
                };
                // Some peers may have gone away; publishing is best effort.
                if let Err(e) = self.network.deliver(&peer, envelope).await {
                    tracing::warn!(peer = ?peer, error = %e, "publish delivery failed");
                }
            }
            Ok(())
        }

        async fn send(&self, peer: &PeerId, topic: Topic, payload: Bytes) -> Result<()> {
            if !self.network.peers_of(&self.peer_id).await.contains(peer) {
                return Err(ExchangeError::Transport(format!("peer not connected: {}", peer)));
            }
            let envelope = Envelope {
                from: self.peer_id,
                topic,
                payload,
            };
            self.network.deliver(peer, envelope).await
        }

        async fn recv(&self) -> Result<Inbound> {
            let mut rx = self.receiver.lock().await;
            rx.recv()
                .await
                .map(Self::unpack)
                .ok_or_else(|| ExchangeError::Transport("channel closed".into()))
        }

        async fn recv_timeout(&self, timeout: Duration) -> Result<Option<Inbound>> {
            let mut rx = self.receiver.lock().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some(Self::unpack(envelope))),
                Ok(None) => Err(ExchangeError::Transport("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        fn local_peer_id(&self) -> PeerId {
            self.peer_id
        }

        fn listen_addrs(&self) -> Vec<String> {
            vec![memory_addr(&self.peer_id)]
        }

        async fn connect(&self, addr: &str) -> Result<PeerId> {
            let peer = parse_memory_addr(addr)?;
            if peer == self.peer_id {
                return Err(ExchangeError::Transport("cannot connect to self".into()));
            }
            if !self.network.senders.read().await.contains_key(&peer) {
                return Err(ExchangeError::Transport(format!("no peer listening at {}", addr)));
            }

            let mut links = self.network.links.write().await;
            links.entry(self.peer_id).or_default().insert(peer);
            links.entry(peer).or_default().insert(self.peer_id);

            tracing::debug!(local = ?self.peer_id, remote = ?peer, "connected");
            Ok(peer)
        }

        async fn connected_peers(&self) -> Result<Vec<PeerId>> {
            let mut peers = self.network.peers_of(&self.peer_id).await;
            peers.sort();
            Ok(peers)
        }
    }
}
