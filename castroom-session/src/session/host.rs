use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use castroom_core::{
    BrokerConfig, CaptureConstraints, CaptureError, ContentHint, LinkPhase, LinkSignal,
    LinkTransition, PeerIdentity, TrackConstraints, VIDEO_BITRATE_CAP_KBPS,
    with_video_bitrate_cap,
};

use crate::broker::{Broker, CallHandle, SdpTransform, SessionEvent};
use crate::media::{CaptureEvent, CaptureSource, LocalStream};
use crate::notify::{Notice, NoticeAction, Notifier};
use crate::session::command::HostCommand;
use crate::session::identity::{IdentityDriver, TimerEvent};
use crate::session::registry::Registry;

const COMMAND_BUFFER: usize = 32;
const TIMER_BUFFER: usize = 8;
const CAPTURE_EVENT_BUFFER: usize = 8;

/// Host-side state published for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStatus {
    /// The room code viewers join with; empty until the broker is ready.
    pub room: PeerIdentity,
    /// Connected viewers in arrival order.
    pub viewers: Vec<PeerIdentity>,
    pub sharing: bool,
}

/// Handle the embedding UI keeps to a running host session.
#[derive(Clone)]
pub struct HostHandle {
    commands: mpsc::Sender<HostCommand>,
    status: watch::Receiver<HostStatus>,
}

impl HostHandle {
    /// Delivers a command; false when the session is gone.
    pub async fn send(&self, command: HostCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub fn status(&self) -> watch::Receiver<HostStatus> {
        self.status.clone()
    }
}

struct ActiveCapture {
    stream: LocalStream,
}

/// Host session event loop.
///
/// Owns the identity session, the viewer registry, the single capture
/// session, and the outbound call fan-out. All state transitions happen on
/// event delivery inside `run`.
pub struct HostSession {
    driver: IdentityDriver,
    capture_source: Arc<dyn CaptureSource>,
    notifier: Arc<dyn Notifier>,
    commands_rx: mpsc::Receiver<HostCommand>,
    timers_rx: mpsc::Receiver<TimerEvent>,
    capture_rx: mpsc::Receiver<CaptureEvent>,
    capture_tx: mpsc::Sender<CaptureEvent>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
    registry: Registry,
    links: HashMap<PeerIdentity, LinkPhase>,
    active: Option<ActiveCapture>,
    calls: HashMap<PeerIdentity, CallHandle>,
    status_tx: watch::Sender<HostStatus>,
}

impl HostSession {
    /// Creates a host session; spawn `run` to start it.
    pub fn new(
        broker: Arc<dyn Broker>,
        config: BrokerConfig,
        capture_source: Arc<dyn CaptureSource>,
        notifier: Arc<dyn Notifier>,
    ) -> (HostHandle, HostSession) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (timers_tx, timers_rx) = mpsc::channel(TIMER_BUFFER);
        let (capture_tx, capture_rx) = mpsc::channel(CAPTURE_EVENT_BUFFER);
        let (status_tx, status_rx) = watch::channel(HostStatus::default());

        let driver = IdentityDriver::new(broker, config, Arc::clone(&notifier), timers_tx);

        let handle = HostHandle {
            commands: commands_tx,
            status: status_rx,
        };
        let session = HostSession {
            driver,
            capture_source,
            notifier,
            commands_rx,
            timers_rx,
            capture_rx,
            capture_tx,
            events_rx: None,
            registry: Registry::new(),
            links: HashMap::new(),
            active: None,
            calls: HashMap::new(),
            status_tx,
        };
        (handle, session)
    }

    /// Event loop; runs until the session is ended.
    pub async fn run(mut self) {
        info!("host session starting");
        self.driver.open_initial().await;
        self.refresh_events();

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    let exit = match command {
                        Some(command) => self.handle_command(command).await,
                        None => true,
                    };
                    if exit {
                        self.end_session().await;
                        break;
                    }
                }

                Some(timer) = self.timers_rx.recv() => {
                    self.driver.handle_timer(timer).await;
                    self.refresh_events();
                }

                Some(event) = self.capture_rx.recv() => {
                    self.handle_capture_event(event).await;
                }

                event = Self::next_session_event(&mut self.events_rx) => {
                    match event {
                        Some(event) => self.handle_session_event(event).await,
                        None => self.events_rx = None,
                    }
                }
            }
        }

        info!("host session finished");
    }

    async fn next_session_event(
        events_rx: &mut Option<mpsc::Receiver<SessionEvent>>,
    ) -> Option<SessionEvent> {
        match events_rx {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    fn refresh_events(&mut self) {
        if let Some(events) = self.driver.take_events() {
            self.events_rx = Some(events);
            // Links and calls died with the discarded session; the broker
            // already told the viewers.
            if !self.registry.is_empty() || !self.calls.is_empty() {
                self.links.clear();
                self.calls.clear();
                self.registry = Registry::new();
                self.publish_status();
            }
        }
    }

    async fn handle_command(&mut self, command: HostCommand) -> bool {
        match command {
            HostCommand::StartCapture => {
                self.start_capture().await;
                false
            }
            HostCommand::StopCapture => {
                self.stop_capture().await;
                false
            }
            HostCommand::EndSession => true,
        }
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready(identity) => {
                self.driver.on_ready(identity).await;
                self.driver.on_recovered().await;
                self.publish_status();
            }
            SessionEvent::LinkOpened(remote) => {
                self.on_link_signal(remote, LinkSignal::Opened).await;
            }
            SessionEvent::LinkData(remote, payload) => {
                match serde_json::from_slice::<serde_json::Value>(&payload) {
                    Ok(value) => debug!("data from {remote}: {value}"),
                    Err(err) => warn!("undecodable payload from {remote}: {err}"),
                }
            }
            SessionEvent::LinkError(remote, message) => {
                warn!("link error from {remote}: {message}");
                self.on_link_signal(remote, LinkSignal::Errored).await;
            }
            SessionEvent::LinkClosed(remote) => {
                self.on_link_signal(remote, LinkSignal::Closed).await;
            }
            SessionEvent::CallOffered(call, from) => {
                debug!("ignoring inbound call {call} from {from} on the host");
            }
            SessionEvent::CallStream(call, _stream) => {
                debug!("ignoring inbound stream for call {call} on the host");
            }
            SessionEvent::CallError(call, message) => {
                warn!("call {call} failed: {message}");
            }
            SessionEvent::CallClosed(call) => {
                // The viewer hung up; membership changes arrive separately
                // as link events.
                self.calls.retain(|_, handle| handle.id != call);
            }
            SessionEvent::Error(err) => self.driver.handle_broker_error(err).await,
            SessionEvent::BrokerLinkLost => self.driver.on_broker_link_lost().await,
            SessionEvent::Closed => self.driver.on_session_closed().await,
        }
    }

    async fn on_link_signal(&mut self, remote: PeerIdentity, signal: LinkSignal) {
        let phase = self
            .links
            .get(&remote)
            .copied()
            .unwrap_or(LinkPhase::Opening);
        match phase.apply(signal) {
            LinkTransition::Entered(LinkPhase::Open) => {
                self.links.insert(remote.clone(), LinkPhase::Open);
                if self.registry.add(remote.clone()) {
                    info!("viewer {remote} joined");
                    self.publish_status();
                    self.reconcile().await;
                }
            }
            LinkTransition::Entered(next) if next.is_terminal() => {
                // Terminal links are forgotten so a rejoin starts fresh;
                // registry idempotence keeps duplicate teardown a no-op.
                self.links.remove(&remote);
                if self.registry.remove(&remote) {
                    info!("viewer {remote} left");
                    self.publish_status();
                    self.reconcile().await;
                }
            }
            LinkTransition::Entered(_) => {}
            LinkTransition::Ignored => {
                debug!("ignoring duplicate link signal from {remote}");
            }
        }
    }

    async fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::PrimaryTrackEnded => {
                let Some(active) = self.active.take() else {
                    return;
                };
                info!("capture track ended, tearing down outbound calls");
                self.close_all_calls().await;
                active.stream.stop_all();
                self.publish_status();
                self.reconcile().await;
            }
        }
    }

    /// Acquires a display capture and fans it out. Rejected while another
    /// capture session is active.
    async fn start_capture(&mut self) {
        if self.active.is_some() {
            warn!("capture already active, ignoring start request");
            return;
        }

        let constraints = CaptureConstraints::default();
        let stream = match self
            .capture_source
            .acquire(&constraints, self.capture_tx.clone())
            .await
        {
            Ok(stream) => stream,
            Err(CaptureError::DeniedOrCancelled) => {
                info!("capture request denied or cancelled");
                self.notifier
                    .notify(Notice::destructive(
                        "Sharing failed",
                        "Screen capture was denied or no shareable surface is available.",
                    ))
                    .await;
                return;
            }
            Err(err) => {
                warn!("capture failed: {err}");
                self.notifier
                    .notify(Notice::destructive("Sharing failed", err.to_string()))
                    .await;
                return;
            }
        };

        // Refinement pass; failure leaves the stream as acquired.
        if let Some(track) = stream.primary_video_track() {
            if let Err(err) = track.apply_constraints(&TrackConstraints::refinement()) {
                warn!("constraint refinement failed: {err}");
            }
            if let Err(err) = track.set_content_hint(ContentHint::Detail) {
                warn!("content hint not applied: {err}");
            }
        }

        self.active = Some(ActiveCapture { stream });
        self.publish_status();
        self.reconcile().await;
    }

    /// Stops capture and releases the session; idempotent.
    async fn stop_capture(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        info!("stopping capture");
        self.close_all_calls().await;
        active.stream.stop_all();
        self.publish_status();
        self.reconcile().await;
    }

    /// Restores the fan-out invariant: while capture is active the set of
    /// live calls equals the registry; otherwise it is empty.
    async fn reconcile(&mut self) {
        let stream = self.active.as_ref().map(|active| active.stream.clone());
        match stream {
            None => {
                if !self.calls.is_empty() {
                    self.close_all_calls().await;
                }
                if !self.registry.is_empty() {
                    self.notifier
                        .notify(
                            Notice::info(
                                "New viewer connected",
                                "Click to start sharing your screen.",
                            )
                            .persistent()
                            .with_action(NoticeAction::StartSharing),
                        )
                        .await;
                }
            }
            Some(stream) => {
                let missing: Vec<PeerIdentity> = self
                    .registry
                    .members()
                    .iter()
                    .filter(|remote| !self.calls.contains_key(*remote))
                    .cloned()
                    .collect();

                let opened = if let Some(session) = self.driver.session() {
                    let transform: SdpTransform =
                        Arc::new(|sdp| with_video_bitrate_cap(&sdp, VIDEO_BITRATE_CAP_KBPS));
                    futures::future::join_all(missing.iter().map(|remote| {
                        session.call(remote, stream.clone(), Arc::clone(&transform))
                    }))
                    .await
                } else {
                    Vec::new()
                };

                for result in opened {
                    match result {
                        Ok(handle) => {
                            info!("calling viewer {}", handle.remote);
                            self.calls.insert(handle.remote.clone(), handle);
                        }
                        Err(err) => warn!("failed to open call: {err}"),
                    }
                }

                let stale: Vec<PeerIdentity> = self
                    .calls
                    .keys()
                    .filter(|remote| !self.registry.contains(remote))
                    .cloned()
                    .collect();
                for remote in stale {
                    self.close_call_to(&remote).await;
                }
            }
        }
    }

    /// Closes one viewer's call; a no-op when already closed.
    async fn close_call_to(&mut self, remote: &PeerIdentity) {
        let Some(handle) = self.calls.remove(remote) else {
            return;
        };
        info!("closing call to {remote}");
        if let Some(session) = self.driver.session() {
            session.close_call(handle.id).await;
        }
    }

    async fn close_all_calls(&mut self) {
        let remotes: Vec<PeerIdentity> = self.calls.keys().cloned().collect();
        for remote in remotes {
            self.close_call_to(&remote).await;
        }
    }

    async fn end_session(&mut self) {
        info!("ending host session");
        if let Some(active) = self.active.take() {
            active.stream.stop_all();
        }
        self.close_all_calls().await;
        self.driver.teardown().await;
        self.events_rx = None;
        self.registry = Registry::new();
        self.links.clear();
        self.publish_status();
        self.notifier
            .notify(Notice::info("Session ended", "Screen sharing has ended."))
            .await;
    }

    fn publish_status(&self) {
        let _ = self.status_tx.send(HostStatus {
            room: self.driver.identity().clone(),
            viewers: self.registry.members().to_vec(),
            sharing: self.active.is_some(),
        });
    }
}
