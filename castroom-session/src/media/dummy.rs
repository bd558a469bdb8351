use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

use castroom_core::{CaptureConstraints, CaptureError, ContentHint, PlaybackError, TrackConstraints};

use crate::media::{
    CaptureEvent, CaptureSource, LocalStream, MediaTrack, RemoteStream, TrackKind, VideoSink,
};

/// Scriptable track used by the dummy backend.
pub struct DummyTrack {
    kind: TrackKind,
    ended: AtomicBool,
    fail_constraints: AtomicBool,
    content_hint: Mutex<Option<ContentHint>>,
    applied: Mutex<Vec<TrackConstraints>>,
    ended_tx: Mutex<Option<mpsc::Sender<CaptureEvent>>>,
}

impl DummyTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            ended: AtomicBool::new(false),
            fail_constraints: AtomicBool::new(false),
            content_hint: Mutex::new(None),
            applied: Mutex::new(Vec::new()),
            ended_tx: Mutex::new(None),
        }
    }

    pub fn set_constraints_fail(&self, fail: bool) {
        self.fail_constraints.store(fail, Ordering::SeqCst);
    }

    pub fn content_hint(&self) -> Option<ContentHint> {
        self.content_hint.lock().map(|hint| *hint).unwrap_or(None)
    }

    pub fn applied_constraints(&self) -> Vec<TrackConstraints> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }

    fn wire_ended_events(&self, events: mpsc::Sender<CaptureEvent>) {
        if let Ok(mut slot) = self.ended_tx.lock() {
            *slot = Some(events);
        }
    }

    /// Simulates the track ending outside the session's control, e.g. the
    /// browser's own "Stop sharing" affordance.
    pub fn end_remotely(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        let sender = self
            .ended_tx
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        if let Some(events) = sender {
            let _ = events.try_send(CaptureEvent::PrimaryTrackEnded);
        }
    }
}

impl MediaTrack for DummyTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn apply_constraints(&self, constraints: &TrackConstraints) -> Result<(), CaptureError> {
        if self.fail_constraints.load(Ordering::SeqCst) {
            return Err(CaptureError::Failed("constraints not satisfiable".into()));
        }
        if let Ok(mut applied) = self.applied.lock() {
            applied.push(*constraints);
        }
        Ok(())
    }

    fn set_content_hint(&self, hint: ContentHint) -> Result<(), CaptureError> {
        if let Ok(mut slot) = self.content_hint.lock() {
            *slot = Some(hint);
        }
        Ok(())
    }

    fn stop(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

/// Capture backend with scriptable behavior; the reference implementation
/// for the demo binary and the integration tests.
#[derive(Default)]
pub struct DummyCaptureSource {
    denied: AtomicBool,
    refinement_fails: AtomicBool,
    acquisitions: AtomicUsize,
    last_video: Mutex<Option<Arc<DummyTrack>>>,
    last_constraints: Mutex<Option<CaptureConstraints>>,
}

impl DummyCaptureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes acquire behave as if the user declined the prompt.
    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Makes the refinement constraint pass fail on acquired tracks.
    pub fn set_refinement_fails(&self, fails: bool) {
        self.refinement_fails.store(fails, Ordering::SeqCst);
    }

    /// How many times acquire has succeeded.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// The video track of the most recent acquisition.
    pub fn last_video_track(&self) -> Option<Arc<DummyTrack>> {
        self.last_video.lock().map(|slot| slot.clone()).unwrap_or(None)
    }

    /// The constraints the most recent acquisition asked for.
    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.last_constraints
            .lock()
            .map(|slot| *slot)
            .unwrap_or(None)
    }
}

#[async_trait]
impl CaptureSource for DummyCaptureSource {
    async fn acquire(
        &self,
        constraints: &CaptureConstraints,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<LocalStream, CaptureError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(CaptureError::DeniedOrCancelled);
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);

        let video = Arc::new(DummyTrack::new(TrackKind::Video));
        video.set_constraints_fail(self.refinement_fails.load(Ordering::SeqCst));
        video.wire_ended_events(events);

        let audio = Arc::new(DummyTrack::new(TrackKind::Audio));

        if let Ok(mut slot) = self.last_video.lock() {
            *slot = Some(Arc::clone(&video));
        }
        if let Ok(mut slot) = self.last_constraints.lock() {
            *slot = Some(*constraints);
        }

        debug!("dummy capture acquired at {}x{}", constraints.ideal_width, constraints.ideal_height);
        Ok(LocalStream::new(vec![video, audio]))
    }
}

/// Playback surface with a scriptable autoplay policy.
#[derive(Default)]
pub struct DummySink {
    attached: Mutex<Option<RemoteStream>>,
    muted: AtomicBool,
    paused: AtomicBool,
    reject_unmuted_play: AtomicBool,
    reject_all_play: AtomicBool,
    play_attempts: AtomicUsize,
}

impl DummySink {
    pub fn new() -> Self {
        let sink = Self::default();
        sink.paused.store(true, Ordering::SeqCst);
        sink
    }

    /// Refuses unmuted playback, the common autoplay policy.
    pub fn set_reject_unmuted(&self, reject: bool) {
        self.reject_unmuted_play.store(reject, Ordering::SeqCst);
    }

    /// Refuses all playback until a user gesture, the strict policy.
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all_play.store(reject, Ordering::SeqCst);
    }

    pub fn play_attempts(&self) -> usize {
        self.play_attempts.load(Ordering::SeqCst)
    }

    pub fn has_stream(&self) -> bool {
        self.attached
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl VideoSink for DummySink {
    async fn attach(&self, stream: &RemoteStream) {
        if let Ok(mut slot) = self.attached.lock() {
            *slot = Some(stream.clone());
        }
        self.paused.store(true, Ordering::SeqCst);
    }

    async fn detach(&self) {
        if let Ok(mut slot) = self.attached.lock() {
            *slot = None;
        }
        self.paused.store(true, Ordering::SeqCst);
    }

    async fn play(&self) -> Result<(), PlaybackError> {
        self.play_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_all_play.load(Ordering::SeqCst) {
            return Err(PlaybackError::AutoplayPolicy);
        }
        if !self.is_muted() && self.reject_unmuted_play.load(Ordering::SeqCst) {
            return Err(PlaybackError::AutoplayPolicy);
        }
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
