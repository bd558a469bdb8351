use thiserror::Error;

/// Longest broker error message surfaced to the user before truncation.
const SURFACED_MESSAGE_LIMIT: usize = 100;

/// Failures reported by the broker or the connections it carries.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("could not connect to peer: {0}")]
    PeerUnreachable(String),

    #[error("lost connection to server: {0}")]
    LostServerLink(String),

    #[error("socket closed: {0}")]
    SocketClosed(String),

    #[error("broker rejected the request: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

/// Failure classes expected to self-resolve with retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientCause {
    PeerUnreachable,
    LostServerLink,
    SocketClosed,
}

impl BrokerError {
    /// The transient class of this error, or `None` when it must not be
    /// retried.
    pub fn transient_cause(&self) -> Option<TransientCause> {
        match self {
            BrokerError::PeerUnreachable(_) => Some(TransientCause::PeerUnreachable),
            BrokerError::LostServerLink(_) => Some(TransientCause::LostServerLink),
            BrokerError::SocketClosed(_) => Some(TransientCause::SocketClosed),
            BrokerError::Rejected(_) | BrokerError::Other(_) => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient_cause().is_some()
    }

    /// Message suitable for a notification, truncated for display.
    pub fn surfaced_message(&self) -> String {
        let message = self.to_string();
        if message.chars().count() > SURFACED_MESSAGE_LIMIT {
            let cut: String = message.chars().take(SURFACED_MESSAGE_LIMIT).collect();
            format!("{cut}...")
        } else {
            message
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The user declined the capture prompt or no capturable surface exists.
    #[error("capture was denied or cancelled")]
    DeniedOrCancelled,

    #[error("capture failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// The environment refused to start playback without a user gesture.
    #[error("playback blocked by the autoplay policy")]
    AutoplayPolicy,

    #[error("playback failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code is empty")]
    Empty,
}
