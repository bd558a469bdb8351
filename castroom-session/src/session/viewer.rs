use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use castroom_core::{BrokerConfig, ContentHint, PeerIdentity, RoomCode, RoomCodeError};

use crate::broker::{Broker, CallId, SessionEvent};
use crate::media::VideoSink;
use crate::notify::{Notice, Notifier};
use crate::session::command::ViewerCommand;
use crate::session::identity::{IdentityDriver, TimerEvent};
use crate::session::interaction::InteractionFlag;
use crate::session::playback::{PlaybackNegotiator, PlaybackState};

const COMMAND_BUFFER: usize = 32;
const TIMER_BUFFER: usize = 8;
const STREAM_ARRIVAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Viewer-side state published for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerStatus {
    /// The data link to the host is open.
    pub connected: bool,
    pub has_stream: bool,
    pub playback: PlaybackState,
}

/// Handle the embedding UI keeps to a running viewer session.
#[derive(Clone)]
pub struct ViewerHandle {
    commands: mpsc::Sender<ViewerCommand>,
    status: watch::Receiver<ViewerStatus>,
}

impl ViewerHandle {
    /// Delivers a command; false when the session is gone.
    pub async fn send(&self, command: ViewerCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub fn status(&self) -> watch::Receiver<ViewerStatus> {
        self.status.clone()
    }
}

/// Viewer session event loop.
///
/// Joins a room by code, auto-answers the host's call, and reconciles the
/// received stream with the autoplay policy. Link loss feeds the same
/// reconnect protocol the host uses, against the same room code.
pub struct ViewerSession {
    driver: IdentityDriver,
    room: RoomCode,
    sink: Arc<dyn VideoSink>,
    notifier: Arc<dyn Notifier>,
    playback: PlaybackNegotiator,
    commands_rx: mpsc::Receiver<ViewerCommand>,
    timers_rx: mpsc::Receiver<TimerEvent>,
    timers_tx: mpsc::Sender<TimerEvent>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
    arrival_timer: Option<JoinHandle<()>>,
    active_call: Option<CallId>,
    has_stream: bool,
    link_open: bool,
    status_tx: watch::Sender<ViewerStatus>,
}

impl ViewerSession {
    /// Validates the room code and creates a viewer session; spawn `run` to
    /// start it. Malformed input is rejected before any network attempt.
    pub fn join(
        broker: Arc<dyn Broker>,
        config: BrokerConfig,
        room_code: &str,
        sink: Arc<dyn VideoSink>,
        notifier: Arc<dyn Notifier>,
        interaction: Arc<InteractionFlag>,
    ) -> Result<(ViewerHandle, ViewerSession), RoomCodeError> {
        let room = RoomCode::parse(room_code)?;

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (timers_tx, timers_rx) = mpsc::channel(TIMER_BUFFER);
        let (status_tx, status_rx) = watch::channel(ViewerStatus::default());

        let driver = IdentityDriver::new(
            broker,
            config,
            Arc::clone(&notifier),
            timers_tx.clone(),
        );

        let handle = ViewerHandle {
            commands: commands_tx,
            status: status_rx,
        };
        let session = ViewerSession {
            driver,
            room,
            sink,
            notifier,
            playback: PlaybackNegotiator::new(interaction),
            commands_rx,
            timers_rx,
            timers_tx,
            events_rx: None,
            arrival_timer: None,
            active_call: None,
            has_stream: false,
            link_open: false,
            status_tx,
        };
        Ok((handle, session))
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// Event loop; runs until the viewer leaves.
    pub async fn run(mut self) {
        info!("viewer session starting for room {}", self.room);
        self.driver.open_initial().await;
        self.refresh_events().await;

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    let exit = match command {
                        Some(command) => self.handle_command(command).await,
                        None => true,
                    };
                    if exit {
                        self.leave().await;
                        break;
                    }
                }

                Some(timer) = self.timers_rx.recv() => {
                    match timer {
                        TimerEvent::StreamArrivalTimeout => self.on_stream_timeout().await,
                        other => {
                            self.driver.handle_timer(other).await;
                            self.refresh_events().await;
                        }
                    }
                }

                event = Self::next_session_event(&mut self.events_rx) => {
                    match event {
                        Some(event) => self.handle_session_event(event).await,
                        None => self.events_rx = None,
                    }
                }
            }
        }

        info!("viewer session finished");
    }

    async fn next_session_event(
        events_rx: &mut Option<mpsc::Receiver<SessionEvent>>,
    ) -> Option<SessionEvent> {
        match events_rx {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn refresh_events(&mut self) {
        if let Some(events) = self.driver.take_events() {
            self.events_rx = Some(events);
            // The room link and any call died with the discarded session.
            if self.link_open || self.has_stream || self.active_call.is_some() {
                self.link_open = false;
                self.active_call = None;
                self.clear_stream().await;
                self.publish_status();
            }
        }
    }

    async fn handle_command(&mut self, command: ViewerCommand) -> bool {
        match command {
            ViewerCommand::ToggleMute => {
                self.playback.toggle_mute(self.sink.as_ref()).await;
                self.publish_status();
                false
            }
            ViewerCommand::SurfaceTapped => {
                self.playback.surface_tapped(self.sink.as_ref()).await;
                self.publish_status();
                false
            }
            ViewerCommand::PageInteracted => {
                self.playback.page_interacted();
                self.publish_status();
                false
            }
            ViewerCommand::Leave => true,
        }
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready(identity) => {
                self.driver.on_ready(identity).await;
                self.connect_to_room().await;
            }
            SessionEvent::LinkOpened(remote) => {
                if remote == self.room.identity() {
                    self.link_open = true;
                    self.driver.on_recovered().await;
                    self.publish_status();
                    self.send_hello().await;
                    self.notifier
                        .notify(Notice::info(
                            "Connected",
                            "Waiting for the host to share their screen...",
                        ))
                        .await;
                } else {
                    debug!("ignoring link from {remote}");
                }
            }
            SessionEvent::LinkData(remote, _payload) => {
                debug!("data from {remote}");
            }
            SessionEvent::LinkError(remote, message) => {
                warn!("link to {remote} failed: {message}");
                self.link_open = false;
                self.publish_status();
                self.trigger_room_reconnect().await;
            }
            SessionEvent::LinkClosed(remote) => {
                info!("link to {remote} closed");
                self.link_open = false;
                self.clear_stream().await;
                self.publish_status();
                self.trigger_room_reconnect().await;
            }
            SessionEvent::CallOffered(call, from) => {
                self.on_call_offered(call, from).await;
            }
            SessionEvent::CallStream(call, stream) => {
                if self.active_call != Some(call) {
                    debug!("stream for stale call {call} ignored");
                    return;
                }
                self.clear_arrival_timer();

                // Best effort; a track that refuses the hint still plays.
                if let Some(track) = stream.primary_video_track() {
                    if let Err(err) = track.set_content_hint(ContentHint::Detail) {
                        debug!("content hint not applied to remote track: {err}");
                    }
                }

                info!("remote stream arrived from {}", stream.from_identity());
                self.sink.attach(&stream).await;
                self.has_stream = true;
                self.playback
                    .stream_arrived(self.sink.as_ref(), self.notifier.as_ref())
                    .await;
                self.publish_status();
            }
            SessionEvent::CallError(call, message) => {
                warn!("call {call} failed: {message}");
                self.notifier
                    .notify(Notice::destructive("Stream error", message))
                    .await;
            }
            SessionEvent::CallClosed(call) => {
                if self.active_call == Some(call) {
                    info!("call {call} closed by the host");
                    self.active_call = None;
                    self.clear_stream().await;
                    self.publish_status();
                }
            }
            SessionEvent::Error(err) => self.driver.handle_broker_error(err).await,
            SessionEvent::BrokerLinkLost => self.driver.on_broker_link_lost().await,
            SessionEvent::Closed => self.driver.on_session_closed().await,
        }
    }

    /// Link payloads are JSON; the content is a placeholder for now.
    async fn send_hello(&mut self) {
        let Some(session) = self.driver.session() else {
            return;
        };
        let payload = serde_json::json!({ "type": "hello" });
        if let Err(err) = session
            .send(&self.room.identity(), Bytes::from(payload.to_string()))
            .await
        {
            debug!("hello payload not delivered: {err}");
        }
    }

    async fn connect_to_room(&mut self) {
        let result = match self.driver.session() {
            Some(session) => session.connect(&self.room.identity()).await,
            None => return,
        };
        match result {
            Ok(()) => debug!("connect offer sent to room {}", self.room),
            Err(err) => {
                warn!("failed to connect to room {}: {err}", self.room);
                self.driver.handle_broker_error(err).await;
            }
        }
    }

    async fn on_call_offered(&mut self, call: CallId, from: PeerIdentity) {
        info!("incoming call {call} from {from}, answering");
        self.active_call = Some(call);

        let result = match self.driver.session() {
            Some(session) => session.answer(call).await,
            None => return,
        };
        if let Err(err) = result {
            warn!("failed to answer call {call}: {err}");
            return;
        }
        self.arm_arrival_timer();
    }

    async fn on_stream_timeout(&mut self) {
        self.arrival_timer = None;
        if self.has_stream || self.driver.reconnect_in_flight() {
            return;
        }
        info!("no stream within the arrival window");
        self.notifier
            .notify(Notice::info(
                "No stream yet",
                "The host has not started sharing their screen.",
            ))
            .await;
    }

    /// Both link error and a close we did not initiate feed the reconnect
    /// protocol, unless one is already in flight.
    async fn trigger_room_reconnect(&mut self) {
        if self.driver.reconnect_in_flight() {
            debug!("room reconnect already in flight");
            return;
        }
        self.driver.schedule_retry().await;
    }

    fn arm_arrival_timer(&mut self) {
        if let Some(timer) = self.arrival_timer.take() {
            timer.abort();
        }
        let timers_tx = self.timers_tx.clone();
        self.arrival_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(STREAM_ARRIVAL_TIMEOUT).await;
            let _ = timers_tx.send(TimerEvent::StreamArrivalTimeout).await;
        }));
    }

    fn clear_arrival_timer(&mut self) {
        if let Some(timer) = self.arrival_timer.take() {
            timer.abort();
        }
    }

    async fn clear_stream(&mut self) {
        if self.has_stream {
            self.has_stream = false;
            self.sink.detach().await;
            self.playback.stream_cleared();
        }
        self.clear_arrival_timer();
    }

    async fn leave(&mut self) {
        info!("leaving room {}", self.room);
        self.clear_arrival_timer();
        self.clear_stream().await;
        self.driver.teardown().await;
        self.events_rx = None;
        self.link_open = false;
        self.publish_status();
    }

    fn publish_status(&self) {
        let _ = self.status_tx.send(ViewerStatus {
            connected: self.link_open,
            has_stream: self.has_stream,
            playback: self.playback.state(),
        });
    }
}
