use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use castroom_core::{BrokerConfig, BrokerError, PeerIdentity};

use crate::broker::SessionEvent;
use crate::media::LocalStream;

/// Mutation applied to an outbound offer before the broker sends it.
pub type SdpTransform = Arc<dyn Fn(String) -> String + Send + Sync>;

/// Identifies one media call within a broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outbound media call, one per (stream, remote identity) pair.
#[derive(Debug, Clone)]
pub struct CallHandle {
    pub id: CallId,
    pub remote: PeerIdentity,
}

/// Entry point to the peer-connection broker service.
///
/// The broker assigns identities, relays connection offers, and carries the
/// negotiated links and calls. Everything beyond this trait is a black box.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Opens a new identity session. Lifecycle events for the session and
    /// everything it carries arrive on `events`.
    async fn open(
        &self,
        config: BrokerConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Box<dyn BrokerSession>, BrokerError>;
}

/// One live identity session at the broker.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Identity assigned by the broker; unassigned until `Ready` arrives.
    fn identity(&self) -> PeerIdentity;

    /// Opens a reliable data link to a remote identity.
    async fn connect(&self, remote: &PeerIdentity) -> Result<(), BrokerError>;

    /// Sends a JSON payload over an open data link.
    async fn send(&self, remote: &PeerIdentity, payload: Bytes) -> Result<(), BrokerError>;

    /// Starts a media call carrying `stream` to a remote identity. The
    /// transform runs on the offer before it leaves this peer.
    async fn call(
        &self,
        remote: &PeerIdentity,
        stream: LocalStream,
        transform: SdpTransform,
    ) -> Result<CallHandle, BrokerError>;

    /// Answers an incoming call; the remote stream follows as an event.
    async fn answer(&self, call: CallId) -> Result<(), BrokerError>;

    /// Closes one media call; a no-op when already closed.
    async fn close_call(&self, call: CallId);

    /// Lightweight reconnect that keeps the current identity when the
    /// broker allows it.
    async fn reconnect(&self) -> Result<(), BrokerError>;

    /// Destroys the session and every link and call it carries.
    async fn destroy(&self);
}
