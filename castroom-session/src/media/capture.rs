use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use castroom_core::{CaptureConstraints, CaptureError, ContentHint, TrackConstraints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One media track of a local or remote stream.
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    /// Whether the track has ended or been stopped.
    fn is_ended(&self) -> bool;

    fn apply_constraints(&self, constraints: &TrackConstraints) -> Result<(), CaptureError>;

    fn set_content_hint(&self, hint: ContentHint) -> Result<(), CaptureError>;

    /// Stops the track locally. Does not fire the track-ended event.
    fn stop(&self);
}

/// A locally captured stream and its tracks; cheap to clone.
#[derive(Clone)]
pub struct LocalStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl LocalStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    /// The first video track, the one constraints and hints apply to.
    pub fn primary_video_track(&self) -> Option<&Arc<dyn MediaTrack>> {
        self.tracks.iter().find(|track| track.kind() == TrackKind::Video)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Events from the local capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The primary track ended outside the session's control.
    PrimaryTrackEnded,
}

/// Display-capture device boundary.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Acquires a display capture. Track lifecycle events for the acquired
    /// stream arrive on `events`.
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<LocalStream, CaptureError>;
}
