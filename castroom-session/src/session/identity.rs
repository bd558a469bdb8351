use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use castroom_core::{BrokerConfig, BrokerError, PeerIdentity, ReconnectState};

use crate::broker::{Broker, BrokerSession, SessionEvent};
use crate::notify::{Notice, Notifier};

/// Timer events delivered back into a session's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A scheduled full re-open is due.
    RetryDue,
    /// The post-disconnect in-place reconnect attempt is due.
    InPlaceReconnectDue,
    /// The viewer's stream-arrival window elapsed. Handled by the viewer
    /// loop, never by the driver.
    StreamArrivalTimeout,
}

const SESSION_EVENT_BUFFER: usize = 256;
const IN_PLACE_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Owns one broker identity session and its reconnect policy.
///
/// Host and viewer drive this identically from their event loops; the
/// role-specific side effects stay in the loops. At most one reconnect
/// chain is active at a time; trigger events that arrive while one is in
/// flight are ignored.
pub struct IdentityDriver {
    broker: Arc<dyn Broker>,
    config: BrokerConfig,
    notifier: Arc<dyn Notifier>,
    timers_tx: mpsc::Sender<TimerEvent>,
    session: Option<Box<dyn BrokerSession>>,
    fresh_events: Option<mpsc::Receiver<SessionEvent>>,
    identity: PeerIdentity,
    reconnect: ReconnectState,
    pending_timer: Option<JoinHandle<()>>,
    terminal_notified: bool,
    closing: bool,
}

impl IdentityDriver {
    pub fn new(
        broker: Arc<dyn Broker>,
        config: BrokerConfig,
        notifier: Arc<dyn Notifier>,
        timers_tx: mpsc::Sender<TimerEvent>,
    ) -> Self {
        Self {
            broker,
            config,
            notifier,
            timers_tx,
            session: None,
            fresh_events: None,
            identity: PeerIdentity::unassigned(),
            reconnect: ReconnectState::new(),
            pending_timer: None,
            terminal_notified: false,
            closing: false,
        }
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    pub fn session(&self) -> Option<&dyn BrokerSession> {
        self.session.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    /// True while a retry timer is pending or a retry chain has begun but
    /// not yet recovered.
    pub fn reconnect_in_flight(&self) -> bool {
        self.pending_timer.is_some() || self.reconnect.attempts() > 0
    }

    /// Opens the first session. A failure feeds the same retry protocol as
    /// any later one.
    pub async fn open_initial(&mut self) {
        if let Err(err) = self.open_session().await {
            self.handle_broker_error(err).await;
        }
    }

    /// Receiver for the newest broker session, if one was opened since the
    /// last call. The previous receiver must be discarded with it; stale
    /// events die with the old channel.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.fresh_events.take()
    }

    /// The broker assigned an identity.
    pub async fn on_ready(&mut self, identity: PeerIdentity) {
        info!("identity session ready as {identity}");
        self.identity = identity;
    }

    /// The reconnect target is reachable again: the broker session for the
    /// host, the room link for the viewer. Ends any retry chain.
    pub async fn on_recovered(&mut self) {
        self.terminal_notified = false;
        if self.reconnect.record_success() {
            self.notifier
                .notify(Notice::info(
                    "Connection restored",
                    "The link to the broker was rebuilt successfully.",
                ))
                .await;
        }
    }

    /// Classifies a session-level error; transient classes feed the retry
    /// protocol, everything else is surfaced once and not retried.
    pub async fn handle_broker_error(&mut self, err: BrokerError) {
        if err.is_transient() {
            warn!("transient broker failure: {err}");
            self.schedule_retry().await;
        } else {
            warn!("broker failure, not retried: {err}");
            self.notifier
                .notify(Notice::destructive(
                    "Connection error",
                    err.surfaced_message(),
                ))
                .await;
        }
    }

    /// The socket to the broker dropped; try a lightweight in-place
    /// reconnect before falling back to a full re-open.
    pub async fn on_broker_link_lost(&mut self) {
        if self.closing {
            return;
        }
        if self.reconnect_in_flight() {
            debug!("broker link loss ignored, reconnect already in flight");
            return;
        }
        if self.reconnect.is_exhausted() {
            self.notify_exhausted().await;
            return;
        }
        info!("broker link lost, scheduling in-place reconnect");
        self.arm_timer(TimerEvent::InPlaceReconnectDue, IN_PLACE_RECONNECT_DELAY);
    }

    /// The broker closed the session without us asking.
    pub async fn on_session_closed(&mut self) {
        if self.closing {
            return;
        }
        warn!("broker session closed unexpectedly");
        self.schedule_retry().await;
    }

    pub async fn handle_timer(&mut self, timer: TimerEvent) {
        self.pending_timer = None;
        match timer {
            TimerEvent::RetryDue => self.reopen().await,
            TimerEvent::InPlaceReconnectDue => self.reconnect_in_place().await,
            TimerEvent::StreamArrivalTimeout => {}
        }
    }

    /// Cancels any pending timer and schedules the next full re-open, or
    /// surfaces the terminal failure once retries are exhausted.
    pub async fn schedule_retry(&mut self) {
        if self.closing {
            return;
        }
        if self.pending_timer.is_some() {
            debug!("retry trigger ignored, reconnect already in flight");
            return;
        }
        match self.reconnect.next_delay() {
            Some(delay) => {
                info!(
                    "scheduling reconnect attempt {}/{} in {:?}",
                    self.reconnect.attempts() + 1,
                    self.reconnect.max_attempts(),
                    delay
                );
                self.notifier
                    .notify(
                        Notice::progress(
                            "Connection interrupted",
                            format!(
                                "Trying to reconnect... ({}/{})",
                                self.reconnect.attempts() + 1,
                                self.reconnect.max_attempts()
                            ),
                        )
                        .with_duration(delay),
                    )
                    .await;
                self.arm_timer(TimerEvent::RetryDue, delay);
            }
            None => self.notify_exhausted().await,
        }
    }

    async fn notify_exhausted(&mut self) {
        if self.terminal_notified {
            return;
        }
        self.terminal_notified = true;
        warn!("reconnect attempts exhausted");
        self.notifier
            .notify(Notice::destructive(
                "Unable to connect",
                "Retry limit reached. Check your network connection and try again later.",
            ))
            .await;
    }

    fn arm_timer(&mut self, event: TimerEvent, delay: Duration) {
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
        let timers_tx = self.timers_tx.clone();
        self.pending_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = timers_tx.send(event).await;
        }));
    }

    async fn open_session(&mut self) -> Result<(), BrokerError> {
        let (events_tx, events_rx) = mpsc::channel(SESSION_EVENT_BUFFER);
        let session = self.broker.open(self.config.clone(), events_tx).await?;
        self.session = Some(session);
        self.fresh_events = Some(events_rx);
        Ok(())
    }

    /// Full re-open: count the attempt, discard the old session entirely,
    /// open a fresh one.
    async fn reopen(&mut self) {
        if self.closing {
            return;
        }
        self.reconnect.begin_attempt();
        if let Some(old) = self.session.take() {
            old.destroy().await;
        }
        self.identity = PeerIdentity::unassigned();
        if let Err(err) = self.open_session().await {
            self.handle_broker_error(err).await;
        }
    }

    async fn reconnect_in_place(&mut self) {
        if self.closing {
            return;
        }
        let result = match self.session.as_ref() {
            Some(session) => session.reconnect().await,
            None => Err(BrokerError::SocketClosed("no session to revive".into())),
        };
        match result {
            Ok(()) => info!("in-place reconnect accepted by the broker"),
            Err(err) => {
                warn!("in-place reconnect failed, falling back to re-open: {err}");
                self.schedule_retry().await;
            }
        }
    }

    /// Cancels pending timers and destroys the session. Events still in
    /// flight are discarded with the receiver.
    pub async fn teardown(&mut self) {
        self.closing = true;
        if let Some(timer) = self.pending_timer.take() {
            timer.abort();
        }
        if let Some(session) = self.session.take() {
            session.destroy().await;
        }
        self.fresh_events = None;
        self.identity = PeerIdentity::unassigned();
    }
}
