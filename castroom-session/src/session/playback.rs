use std::sync::Arc;
use tracing::{debug, warn};

use castroom_core::PlaybackError;

use crate::media::VideoSink;
use crate::notify::{Notice, Notifier};
use crate::session::InteractionFlag;

/// Viewer-side playback flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub has_remote_stream: bool,
    pub muted: bool,
    pub user_has_interacted: bool,
    pub pending_user_interaction: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            has_remote_stream: false,
            muted: true,
            user_has_interacted: false,
            pending_user_interaction: false,
        }
    }
}

/// Reconciles a remote stream with the environment's autoplay policy.
///
/// Playback starts muted; an unmuted rejection forces mute and retries
/// once; a muted rejection parks the stream until a user gesture.
pub struct PlaybackNegotiator {
    state: PlaybackState,
    interaction: Arc<InteractionFlag>,
    tap_notice_shown: bool,
}

impl PlaybackNegotiator {
    pub fn new(interaction: Arc<InteractionFlag>) -> Self {
        Self {
            state: PlaybackState::default(),
            interaction,
            tap_notice_shown: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// A new remote stream was published.
    pub async fn stream_arrived(&mut self, sink: &dyn VideoSink, notifier: &dyn Notifier) {
        self.state.has_remote_stream = true;
        self.try_play(sink, notifier).await;
    }

    pub fn stream_cleared(&mut self) {
        self.state.has_remote_stream = false;
    }

    async fn try_play(&mut self, sink: &dyn VideoSink, notifier: &dyn Notifier) {
        loop {
            sink.set_muted(self.state.muted);
            match sink.play().await {
                Ok(()) => return,
                Err(PlaybackError::AutoplayPolicy) => {
                    self.state.pending_user_interaction = true;
                    if !self.state.muted {
                        debug!("unmuted playback rejected by the autoplay policy, retrying muted");
                        self.state.muted = true;
                        continue;
                    }
                    if !self.tap_notice_shown {
                        self.tap_notice_shown = true;
                        notifier
                            .notify(Notice::info(
                                "Playback paused",
                                "Tap the video to start playback.",
                            ))
                            .await;
                    }
                    return;
                }
                Err(err) => {
                    warn!("playback failed: {err}");
                    return;
                }
            }
        }
    }

    /// Explicit mute toggle; counts as the page's first interaction whether
    /// or not the resulting resume succeeds.
    pub async fn toggle_mute(&mut self, sink: &dyn VideoSink) {
        self.state.muted = !self.state.muted;
        sink.set_muted(self.state.muted);
        if !self.state.muted && sink.is_paused() {
            if let Err(err) = sink.play().await {
                warn!("resume after unmute failed: {err}");
            }
        }
        self.state.pending_user_interaction = false;
        self.state.user_has_interacted = true;
        self.interaction.mark_interacted();
    }

    /// A tap on the video surface acts as the unmute gesture while an
    /// interaction is pending.
    pub async fn surface_tapped(&mut self, sink: &dyn VideoSink) {
        if self.state.pending_user_interaction {
            self.toggle_mute(sink).await;
        }
    }

    /// First interaction anywhere on the page.
    pub fn page_interacted(&mut self) {
        self.state.user_has_interacted = true;
        self.interaction.mark_interacted();
    }
}
