use async_trait::async_trait;
use std::sync::Arc;

use castroom_core::{PeerIdentity, PlaybackError};

use crate::media::{MediaTrack, TrackKind};

/// A stream received from a remote peer; cheap to clone.
#[derive(Clone)]
pub struct RemoteStream {
    from: PeerIdentity,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl RemoteStream {
    pub fn new(from: PeerIdentity, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { from, tracks }
    }

    pub fn from_identity(&self) -> &PeerIdentity {
        &self.from
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn primary_video_track(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.tracks.iter().find(|track| track.kind() == TrackKind::Video)
    }
}

/// Playback surface boundary, a video element in browser terms.
///
/// `play` resolves against the environment's autoplay policy; the caller
/// owns the muted/pending state machine.
#[async_trait]
pub trait VideoSink: Send + Sync {
    async fn attach(&self, stream: &RemoteStream);

    async fn detach(&self);

    /// Attempts to start playback with the current muted state.
    async fn play(&self) -> Result<(), PlaybackError>;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    fn is_paused(&self) -> bool;
}
