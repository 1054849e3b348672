//! Exchange protocol: access-gated request/response over the transport.
//!
//! Each outstanding request moves `Sent -> {Served, Dropped, TimedOut}`.
//! The serving peer decides between `Served` and `Dropped`; the requester
//! imposes `TimedOut` locally since the transport never acknowledges.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, watch};

use travlr_access::Authorizer;
use travlr_core::{DataKey, Did, PeerId};
use travlr_store::VersionedStore;

use crate::error::{ExchangeError, Result};
use crate::messages::{decode, encode, DataRequest, DataResponse, Topic};
use crate::transport::{Inbound, Transport};

/// Configuration for exchange behavior.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// How long a requester waits for a response before giving up.
    pub request_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Lifecycle state of a data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Published, no outcome yet.
    Sent,
    /// An authorized response was published.
    Served,
    /// The serving peer declined to answer.
    Dropped,
    /// The requester stopped waiting.
    TimedOut,
}

impl RequestState {
    /// Check if no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestState::Sent)
    }
}

/// Requester-side outcome of a data request.
///
/// A denial and a missing record both surface as `TimedOut`: the requester
/// cannot tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// A response arrived.
    Served(DataResponse),
    /// No response arrived in time.
    TimedOut,
}

impl RequestOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> RequestState {
        match self {
            RequestOutcome::Served(_) => RequestState::Served,
            RequestOutcome::TimedOut => RequestState::TimedOut,
        }
    }

    /// The response, if one arrived.
    pub fn into_response(self) -> Option<DataResponse> {
        match self {
            RequestOutcome::Served(response) => Some(response),
            RequestOutcome::TimedOut => None,
        }
    }
}

/// Serving-side outcome of an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The latest version was published back.
    Served,
    /// Nothing was sent: no access, or no such record.
    Dropped,
}

impl ServeOutcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(self) -> RequestState {
        match self {
            ServeOutcome::Served => RequestState::Served,
            ServeOutcome::Dropped => RequestState::Dropped,
        }
    }
}

/// Snapshot of exchange counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Requests this node published.
    pub requests_sent: u64,
    /// Inbound requests answered with data.
    pub requests_served: u64,
    /// Inbound requests dropped without a reply.
    pub requests_dropped: u64,
    /// Local requests that timed out.
    pub requests_timed_out: u64,
    /// Responses matched to a local request.
    pub responses_received: u64,
    /// Received values written to the local store.
    pub responses_stored: u64,
    /// Records released through the direct-send path.
    pub direct_sends: u64,
    /// Inbound payloads discarded as undecodable.
    pub invalid_messages: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests_sent: AtomicU64,
    requests_served: AtomicU64,
    requests_dropped: AtomicU64,
    requests_timed_out: AtomicU64,
    responses_received: AtomicU64,
    responses_stored: AtomicU64,
    direct_sends: AtomicU64,
    invalid_messages: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ExchangeStats {
        ExchangeStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_served: self.requests_served.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            requests_timed_out: self.requests_timed_out.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            responses_stored: self.responses_stored.load(Ordering::Relaxed),
            direct_sends: self.direct_sends.load(Ordering::Relaxed),
            invalid_messages: self.invalid_messages.load(Ordering::Relaxed),
        }
    }
}

type PendingMap = HashMap<(Did, DataKey), Vec<oneshot::Sender<DataResponse>>>;

fn lock_pending(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop waiters for (requester, key) whose handle has gone away.
fn prune_closed(pending: &Mutex<PendingMap>, requester: &Did, key: &DataKey) {
    let mut pending = lock_pending(pending);
    let pair = (requester.clone(), key.clone());
    if let Some(waiters) = pending.get_mut(&pair) {
        waiters.retain(|tx| !tx.is_closed());
        if waiters.is_empty() {
            pending.remove(&pair);
        }
    }
}

/// Handle to an outstanding data request.
#[derive(Debug)]
pub struct RequestHandle {
    request: DataRequest,
    receiver: oneshot::Receiver<DataResponse>,
    timeout: Duration,
    pending: Arc<Mutex<PendingMap>>,
    counters: Arc<Counters>,
}

impl RequestHandle {
    /// The request this handle tracks.
    pub fn request(&self) -> &DataRequest {
        &self.request
    }

    /// Wait for the response using the configured timeout.
    pub async fn wait(self) -> RequestOutcome {
        let timeout = self.timeout;
        self.wait_timeout(timeout).await
    }

    /// Wait for the response for at most `timeout`.
    ///
    /// On timeout the request stops being tracked; a late response is
    /// ignored as unsolicited.
    pub async fn wait_timeout(self, timeout: Duration) -> RequestOutcome {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(response)) => RequestOutcome::Served(response),
            // Protocol dropped the sender, or the clock ran out.
            Ok(Err(_)) | Err(_) => {
                prune_closed(&self.pending, &self.request.requester, &self.request.data_key);
                Counters::bump(&self.counters.requests_timed_out);
                tracing::debug!(
                    requester = %self.request.requester,
                    key = %self.request.data_key,
                    "request timed out"
                );
                RequestOutcome::TimedOut
            }
        }
    }
}

/// The exchange protocol.
///
/// Gates every release of data on the authorizer. On the broadcast path a
/// denial is silent; on the direct-send path it is an
/// [`ExchangeError::AccessDenied`].
pub struct ExchangeProtocol<A: Authorizer, S: VersionedStore, T: Transport> {
    authorizer: A,
    store: S,
    transport: T,
    config: ExchangeConfig,
    pending: Arc<Mutex<PendingMap>>,
    counters: Arc<Counters>,
}

impl<A: Authorizer, S: VersionedStore, T: Transport> ExchangeProtocol<A, S, T> {
    /// Create a new exchange.
    pub fn new(authorizer: A, store: S, transport: T, config: ExchangeConfig) -> Self {
        Self {
            authorizer,
            store,
            transport,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// The authorizer consulted before any release.
    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    /// The store records are served from.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The active configuration.
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Current counters.
    pub fn stats(&self) -> ExchangeStats {
        self.counters.snapshot()
    }

    /// Number of distinct (requester, key) pairs awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, PendingMap> {
        lock_pending(&self.pending)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requester side
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish a request for `key` on behalf of `requester`.
    ///
    /// The returned handle resolves when a matching response arrives through
    /// [`ExchangeProtocol::process_next`] or [`ExchangeProtocol::run`].
    pub async fn request_data(&self, requester: &Did, key: &DataKey) -> Result<RequestHandle> {
        let request = DataRequest::new(requester.clone(), key.clone());
        let payload = encode(&request)?;

        // Registered before publishing so a fast response is never missed.
        let (tx, rx) = oneshot::channel();
        self.pending()
            .entry((requester.clone(), key.clone()))
            .or_default()
            .push(tx);

        if let Err(e) = self.transport.publish(Topic::DataRequest, payload).await {
            drop(rx);
            prune_closed(&self.pending, requester, key);
            return Err(e);
        }

        Counters::bump(&self.counters.requests_sent);
        tracing::debug!(%requester, %key, "published data request");

        Ok(RequestHandle {
            request,
            receiver: rx,
            timeout: self.config.request_timeout,
            pending: Arc::clone(&self.pending),
            counters: Arc::clone(&self.counters),
        })
    }

    /// Deliver a response to every local waiter for its (requester, key).
    ///
    /// A response to a local request is also appended to the local store as a
    /// new version, provided the requester still has access to the key.
    /// Unsolicited responses are neither stored nor delivered.
    ///
    /// Returns how many waiters received it. Waiters are woken even when
    /// storing fails; the store error is returned afterwards.
    pub async fn handle_response(&self, response: DataResponse) -> Result<usize> {
        let pair = (response.requester.clone(), response.data_key.clone());
        let waiters = self.pending().remove(&pair);
        let Some(waiters) = waiters else {
            tracing::debug!(
                requester = %response.requester,
                key = %response.data_key,
                "ignoring unsolicited response"
            );
            return Ok(0);
        };

        let stored = self.store_received(&response).await;

        let delivered = waiters
            .into_iter()
            .filter(|tx| !tx.is_closed())
            .map(|tx| tx.send(response.clone()).is_ok())
            .filter(|ok| *ok)
            .count();

        if delivered > 0 {
            Counters::bump(&self.counters.responses_received);
        }
        stored?;
        Ok(delivered)
    }

    async fn store_received(&self, response: &DataResponse) -> Result<()> {
        let DataResponse {
            requester,
            data_key: key,
            data,
        } = response;

        if !self.authorizer.has_access(requester, key).await? {
            tracing::debug!(%requester, %key, "not storing received data: no access");
            return Ok(());
        }

        let version = self.store.put(key, data.clone()).await?;
        Counters::bump(&self.counters.responses_stored);
        tracing::debug!(%requester, %key, version = version.version, "stored received data");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serving side
    // ─────────────────────────────────────────────────────────────────────────

    /// Answer an inbound request.
    ///
    /// Publishes the latest version when the requester has access and the
    /// record exists. Otherwise nothing is sent, so a denial and a missing
    /// record look the same from the outside.
    pub async fn handle_request(&self, request: &DataRequest) -> Result<ServeOutcome> {
        let DataRequest {
            requester,
            data_key: key,
        } = request;

        if !self.authorizer.has_access(requester, key).await? {
            tracing::debug!(%requester, %key, "dropping request: no access");
            Counters::bump(&self.counters.requests_dropped);
            return Ok(ServeOutcome::Dropped);
        }

        let Some(latest) = self.store.get_latest(key).await? else {
            tracing::debug!(%requester, %key, "dropping request: no such record");
            Counters::bump(&self.counters.requests_dropped);
            return Ok(ServeOutcome::Dropped);
        };

        let response = DataResponse {
            requester: requester.clone(),
            data_key: key.clone(),
            data: latest.value,
        };
        self.transport
            .publish(Topic::DataResponse, encode(&response)?)
            .await?;

        Counters::bump(&self.counters.requests_served);
        tracing::debug!(%requester, %key, version = latest.version, "served request");
        Ok(ServeOutcome::Served)
    }

    /// Send `data` for `key` directly to `peer`, released to `recipient`.
    ///
    /// Fails with [`ExchangeError::AccessDenied`] if `recipient` has no access
    /// to `key`; nothing leaves the node in that case.
    pub async fn send_data(
        &self,
        peer: &PeerId,
        recipient: &Did,
        key: &DataKey,
        data: Value,
    ) -> Result<()> {
        if !self.authorizer.has_access(recipient, key).await? {
            tracing::debug!(%recipient, %key, "direct send denied");
            return Err(ExchangeError::AccessDenied {
                recipient: recipient.clone(),
                key: key.clone(),
            });
        }

        let response = DataResponse {
            requester: recipient.clone(),
            data_key: key.clone(),
            data,
        };
        self.transport
            .send(peer, Topic::DataResponse, encode(&response)?)
            .await?;

        Counters::bump(&self.counters.direct_sends);
        Ok(())
    }

    /// Send the latest stored version of `key` directly to `peer`.
    ///
    /// Returns `false` if there is no such record. Access is checked first,
    /// so a denied caller learns nothing about whether the record exists.
    pub async fn send_latest(&self, peer: &PeerId, recipient: &Did, key: &DataKey) -> Result<bool> {
        if !self.authorizer.has_access(recipient, key).await? {
            tracing::debug!(%recipient, %key, "direct send denied");
            return Err(ExchangeError::AccessDenied {
                recipient: recipient.clone(),
                key: key.clone(),
            });
        }

        match self.store.get_latest(key).await? {
            Some(latest) => {
                self.send_data(peer, recipient, key, latest.value).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Dispatch one inbound payload.
    ///
    /// Undecodable payloads are logged and discarded.
    pub async fn dispatch(&self, inbound: Inbound) -> Result<()> {
        match inbound.topic {
            Topic::DataRequest => match decode::<DataRequest>(&inbound.payload) {
                Ok(request) => {
                    self.handle_request(&request).await?;
                }
                Err(e) => self.discard(&inbound, &e),
            },
            Topic::DataResponse => match decode::<DataResponse>(&inbound.payload) {
                Ok(response) => {
                    self.handle_response(response).await?;
                }
                Err(e) => self.discard(&inbound, &e),
            },
        }
        Ok(())
    }

    fn discard(&self, inbound: &Inbound, error: &ExchangeError) {
        Counters::bump(&self.counters.invalid_messages);
        tracing::warn!(
            from = ?inbound.from,
            topic = %inbound.topic,
            error = %error,
            "discarding undecodable payload"
        );
    }

    /// Process at most one inbound payload, waiting up to `timeout`.
    ///
    /// Returns whether a payload was processed.
    pub async fn process_next(&self, timeout: Duration) -> Result<bool> {
        match self.transport.recv_timeout(timeout).await? {
            Some(inbound) => {
                self.dispatch(inbound).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Process inbound payloads until `shutdown` turns true or the transport
    /// closes.
    ///
    /// Failures while handling one payload are logged and do not stop the
    /// loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(peer = ?self.transport.local_peer_id(), "exchange loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                inbound = self.transport.recv() => {
                    let inbound = inbound?;
                    if let Err(e) = self.dispatch(inbound).await {
                        tracing::warn!(error = %e, "failed to handle inbound message");
                    }
                }
            }
        }

        tracing::info!("exchange loop stopped");
        Ok(())
    }
}
