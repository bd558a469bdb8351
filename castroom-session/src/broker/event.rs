use bytes::Bytes;

use castroom_core::{BrokerError, PeerIdentity};

use crate::broker::CallId;
use crate::media::RemoteStream;

/// Lifecycle events for one identity session.
///
/// For a given link the broker delivers open, then data, then exactly one of
/// error or close, never out of order.
pub enum SessionEvent {
    /// The broker assigned an identity.
    Ready(PeerIdentity),
    LinkOpened(PeerIdentity),
    LinkData(PeerIdentity, Bytes),
    LinkError(PeerIdentity, String),
    LinkClosed(PeerIdentity),
    CallOffered(CallId, PeerIdentity),
    CallStream(CallId, RemoteStream),
    CallError(CallId, String),
    CallClosed(CallId),
    /// Session-level failure; transient causes feed the retry protocol.
    Error(BrokerError),
    /// The socket to the broker dropped; the session may be revivable in
    /// place.
    BrokerLinkLost,
    /// The session was closed at the broker.
    Closed,
}
