use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use castroom_core::{BrokerConfig, BrokerError, PeerIdentity};

use crate::broker::{Broker, BrokerSession, CallHandle, CallId, SdpTransform, SessionEvent};
use crate::media::{LocalStream, RemoteStream};

/// Offer template used for calls routed in process. Real brokers produce a
/// full negotiated description; the transform hook sees the same shape.
const LOOPBACK_OFFER_SDP: &str = "v=0\r\n\
o=- 0 0 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:video\r\n\
a=sendonly\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=mid:audio\r\n\
a=sendonly\r\n";

struct PeerEntry {
    events: mpsc::Sender<SessionEvent>,
    detached: bool,
}

struct CallRoute {
    caller: String,
    callee: String,
    offer: String,
    stream: LocalStream,
}

struct LoopbackInner {
    peers: DashMap<String, PeerEntry>,
    links: DashMap<(String, String), ()>,
    calls: DashMap<u64, CallRoute>,
    next_call: AtomicU64,
    fail_opens: AtomicUsize,
    reconnect_allowed: AtomicBool,
    hold_streams: AtomicBool,
}

impl LoopbackInner {
    fn events_for(&self, peer: &str) -> Option<mpsc::Sender<SessionEvent>> {
        self.peers.get(peer).map(|entry| entry.events.clone())
    }

    /// Like `events_for`, but a peer whose broker socket dropped cannot be
    /// signaled until it reconnects.
    fn routable_events_for(&self, peer: &str) -> Option<mpsc::Sender<SessionEvent>> {
        self.peers.get(peer).and_then(|entry| {
            if entry.detached {
                None
            } else {
                Some(entry.events.clone())
            }
        })
    }

    fn take_injected_open_failure(&self) -> bool {
        self.fail_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-process broker: routes links and calls between sessions of one
/// process. Reference backend for the demo binary and the integration
/// tests; failure injection is scripted through the handle.
#[derive(Clone)]
pub struct LoopbackBroker {
    inner: Arc<LoopbackInner>,
}

impl LoopbackBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoopbackInner {
                peers: DashMap::new(),
                links: DashMap::new(),
                calls: DashMap::new(),
                next_call: AtomicU64::new(0),
                fail_opens: AtomicUsize::new(0),
                reconnect_allowed: AtomicBool::new(true),
                hold_streams: AtomicBool::new(false),
            }),
        }
    }

    /// Makes the next `count` open attempts fail with a transient error.
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.fail_opens.store(count, Ordering::SeqCst);
    }

    /// Whether in-place reconnects are accepted.
    pub fn set_reconnect_allowed(&self, allowed: bool) {
        self.inner.reconnect_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Simulates losing the socket between a peer and the broker.
    pub async fn drop_broker_link(&self, identity: &PeerIdentity) {
        let Some(events) = ({
            let mut detached = None;
            if let Some(mut entry) = self.inner.peers.get_mut(identity.as_str()) {
                entry.detached = true;
                detached = Some(entry.events.clone());
            }
            detached
        }) else {
            return;
        };
        let _ = events.send(SessionEvent::BrokerLinkLost).await;
    }

    /// Answers succeed but the remote stream is withheld, simulating a host
    /// that never starts sharing.
    pub fn set_hold_streams(&self, hold: bool) {
        self.inner.hold_streams.store(hold, Ordering::SeqCst);
    }

    /// The transformed offer of a live call, for inspection.
    pub fn offer_sdp(&self, call: CallId) -> Option<String> {
        self.inner.calls.get(&call.0).map(|route| route.offer.clone())
    }

    /// The transformed offers of every live call, for inspection.
    pub fn live_offer_sdps(&self) -> Vec<String> {
        self.inner
            .calls
            .iter()
            .map(|entry| entry.offer.clone())
            .collect()
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.len()
    }

    /// Identities with a live call from `caller`.
    pub fn call_targets(&self, caller: &PeerIdentity) -> Vec<PeerIdentity> {
        self.inner
            .calls
            .iter()
            .filter(|entry| entry.caller == caller.as_str())
            .map(|entry| PeerIdentity::from(entry.callee.clone()))
            .collect()
    }
}

impl Default for LoopbackBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for LoopbackBroker {
    async fn open(
        &self,
        _config: BrokerConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn BrokerSession>, BrokerError> {
        if self.inner.take_injected_open_failure() {
            return Err(BrokerError::SocketClosed("injected socket drop".into()));
        }

        let id = Uuid::new_v4().to_string();
        self.inner.peers.insert(
            id.clone(),
            PeerEntry {
                events: events.clone(),
                detached: false,
            },
        );
        info!("loopback peer registered as {id}");

        let _ = events
            .send(SessionEvent::Ready(PeerIdentity::from(id.clone())))
            .await;

        Ok(Box::new(LoopbackSession {
            id,
            inner: Arc::clone(&self.inner),
            events,
            destroyed: AtomicBool::new(false),
        }))
    }
}

struct LoopbackSession {
    id: String,
    inner: Arc<LoopbackInner>,
    events: mpsc::Sender<SessionEvent>,
    destroyed: AtomicBool,
}

impl LoopbackSession {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerSession for LoopbackSession {
    fn identity(&self) -> PeerIdentity {
        PeerIdentity::from(self.id.clone())
    }

    async fn connect(&self, remote: &PeerIdentity) -> Result<(), BrokerError> {
        if self.is_destroyed() {
            return Err(BrokerError::SocketClosed("session destroyed".into()));
        }
        let Some(remote_events) = self.inner.routable_events_for(remote.as_str()) else {
            return Err(BrokerError::PeerUnreachable(format!(
                "no such peer {remote}"
            )));
        };

        self.inner
            .links
            .insert((self.id.clone(), remote.as_str().to_string()), ());

        let _ = remote_events
            .send(SessionEvent::LinkOpened(self.identity()))
            .await;
        let _ = self
            .events
            .send(SessionEvent::LinkOpened(remote.clone()))
            .await;
        debug!("loopback link {} <-> {remote}", self.id);
        Ok(())
    }

    async fn send(&self, remote: &PeerIdentity, payload: Bytes) -> Result<(), BrokerError> {
        let Some(remote_events) = self.inner.events_for(remote.as_str()) else {
            return Err(BrokerError::PeerUnreachable(format!(
                "no such peer {remote}"
            )));
        };
        let _ = remote_events
            .send(SessionEvent::LinkData(self.identity(), payload))
            .await;
        Ok(())
    }

    async fn call(
        &self,
        remote: &PeerIdentity,
        stream: LocalStream,
        transform: SdpTransform,
    ) -> Result<CallHandle, BrokerError> {
        if self.is_destroyed() {
            return Err(BrokerError::SocketClosed("session destroyed".into()));
        }
        let Some(remote_events) = self.inner.routable_events_for(remote.as_str()) else {
            return Err(BrokerError::PeerUnreachable(format!(
                "no such peer {remote}"
            )));
        };

        let id = self.inner.next_call.fetch_add(1, Ordering::SeqCst) + 1;
        let offer = transform(LOOPBACK_OFFER_SDP.to_string());
        self.inner.calls.insert(
            id,
            CallRoute {
                caller: self.id.clone(),
                callee: remote.as_str().to_string(),
                offer,
                stream,
            },
        );

        let _ = remote_events
            .send(SessionEvent::CallOffered(CallId(id), self.identity()))
            .await;
        debug!("loopback call {id} offered to {remote}");

        Ok(CallHandle {
            id: CallId(id),
            remote: remote.clone(),
        })
    }

    async fn answer(&self, call: CallId) -> Result<(), BrokerError> {
        let (caller, stream) = {
            let Some(route) = self.inner.calls.get(&call.0) else {
                return Err(BrokerError::Other(format!("unknown call {call}")));
            };
            if route.callee != self.id {
                return Err(BrokerError::Rejected(format!(
                    "call {call} was not offered to this peer"
                )));
            }
            (route.caller.clone(), route.stream.clone())
        };

        if self.inner.hold_streams.load(Ordering::SeqCst) {
            debug!("stream for call {call} withheld");
            return Ok(());
        }

        let remote_stream = RemoteStream::new(PeerIdentity::from(caller), stream.tracks().to_vec());
        let _ = self
            .events
            .send(SessionEvent::CallStream(call, remote_stream))
            .await;
        Ok(())
    }

    async fn close_call(&self, call: CallId) {
        let Some((_, route)) = self.inner.calls.remove(&call.0) else {
            return;
        };
        let other = if route.caller == self.id {
            route.callee
        } else {
            route.caller
        };
        if let Some(other_events) = self.inner.events_for(&other) {
            let _ = other_events.send(SessionEvent::CallClosed(call)).await;
        }
        debug!("loopback call {call} closed");
    }

    async fn reconnect(&self) -> Result<(), BrokerError> {
        if self.is_destroyed() {
            return Err(BrokerError::SocketClosed("session destroyed".into()));
        }
        if !self.inner.reconnect_allowed.load(Ordering::SeqCst) {
            return Err(BrokerError::LostServerLink(
                "broker refused the in-place reconnect".into(),
            ));
        }
        let Some(mut entry) = self.inner.peers.get_mut(&self.id) else {
            return Err(BrokerError::SocketClosed(
                "identity no longer registered".into(),
            ));
        };
        entry.detached = false;
        drop(entry);

        let _ = self.events.send(SessionEvent::Ready(self.identity())).await;
        info!("loopback peer {} reconnected in place", self.id);
        Ok(())
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.peers.remove(&self.id);

        let link_keys: Vec<(String, String)> = self
            .inner
            .links
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|(a, b)| a == &self.id || b == &self.id)
            .collect();
        for key in link_keys {
            self.inner.links.remove(&key);
            let partner = if key.0 == self.id { key.1 } else { key.0 };
            if let Some(partner_events) = self.inner.events_for(&partner) {
                let _ = partner_events
                    .send(SessionEvent::LinkClosed(self.identity()))
                    .await;
            }
        }

        let call_ids: Vec<u64> = self
            .inner
            .calls
            .iter()
            .filter(|entry| entry.caller == self.id || entry.callee == self.id)
            .map(|entry| *entry.key())
            .collect();
        for id in call_ids {
            if let Some((_, route)) = self.inner.calls.remove(&id) {
                let other = if route.caller == self.id {
                    route.callee
                } else {
                    route.caller
                };
                if let Some(other_events) = self.inner.events_for(&other) {
                    let _ = other_events.send(SessionEvent::CallClosed(CallId(id))).await;
                }
            }
        }

        let _ = self.events.send(SessionEvent::Closed).await;
        debug!(
            "loopback peer {} destroyed, {} remain",
            self.id,
            self.inner.peers.len()
        );
    }
}
