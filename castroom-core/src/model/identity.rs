use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::error::RoomCodeError;

/// Identity assigned by the broker once a session opens.
///
/// Empty until the broker reports ready; replaced wholesale on reconnect,
/// never mutated in place.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The host's identity as shared with viewers.
///
/// Parsing trims whitespace and rejects empty input before any network
/// attempt is made.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RoomCodeError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The peer identity this room code names.
    pub fn identity(&self) -> PeerIdentity {
        PeerIdentity::from(self.0.clone())
    }
}

impl From<&PeerIdentity> for RoomCode {
    fn from(identity: &PeerIdentity) -> Self {
        Self(identity.as_str().to_string())
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the join URL a viewer can open directly.
pub fn share_link(origin: &str, code: &RoomCode) -> String {
    format!("{}/join?room={}", origin.trim_end_matches('/'), code)
}

/// Extracts the room code from a share link, if present.
pub fn room_from_link(url: &str) -> Option<RoomCode> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);

    for pair in query.split('&') {
        if let Some(("room", value)) = pair.split_once('=') {
            return RoomCode::parse(value).ok();
        }
    }
    None
}
