use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use castroom_core::{BrokerConfig, RoomCodeError};
use castroom_session::{
    DummyCaptureSource, DummySink, HostHandle, HostSession, InteractionFlag, LoopbackBroker,
    Notice, ViewerHandle, ViewerSession,
};

use super::recording_notifier::RecordingNotifier;

/// Every test runs under paused time, so generous virtual deadlines are
/// free; this must outlast a full backoff chain (1+2+4+8+16 s).
pub const STATUS_TIMEOUT_MS: u64 = 120_000;

pub struct HostFixture {
    pub handle: HostHandle,
    pub capture: Arc<DummyCaptureSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub task: JoinHandle<()>,
}

pub fn spawn_host(broker: &LoopbackBroker) -> HostFixture {
    let capture = Arc::new(DummyCaptureSource::new());
    let (notifier, notices) = RecordingNotifier::new();

    let (handle, session) = HostSession::new(
        Arc::new(broker.clone()),
        BrokerConfig::default(),
        capture.clone(),
        notifier.clone(),
    );
    let task = tokio::spawn(session.run());

    HostFixture {
        handle,
        capture,
        notifier,
        notices,
        task,
    }
}

pub struct ViewerFixture {
    pub handle: ViewerHandle,
    pub sink: Arc<DummySink>,
    pub notifier: Arc<RecordingNotifier>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
    pub task: JoinHandle<()>,
}

/// Spawns a viewer whose sink enforces the common autoplay policy: muted
/// playback is allowed, unmuted playback needs a gesture.
pub fn spawn_viewer(
    broker: &LoopbackBroker,
    room_code: &str,
) -> Result<ViewerFixture, RoomCodeError> {
    let sink = Arc::new(DummySink::new());
    sink.set_reject_unmuted(true);
    spawn_viewer_with_sink(broker, room_code, sink)
}

pub fn spawn_viewer_with_sink(
    broker: &LoopbackBroker,
    room_code: &str,
    sink: Arc<DummySink>,
) -> Result<ViewerFixture, RoomCodeError> {
    let (notifier, notices) = RecordingNotifier::new();

    let (handle, session) = ViewerSession::join(
        Arc::new(broker.clone()),
        BrokerConfig::default(),
        room_code,
        sink.clone(),
        notifier.clone(),
        Arc::new(InteractionFlag::new()),
    )?;
    let task = tokio::spawn(session.run());

    Ok(ViewerFixture {
        handle,
        sink,
        notifier,
        notices,
        task,
    })
}

/// Waits until a status channel satisfies the predicate.
pub async fn wait_for<T, F>(status: &mut watch::Receiver<T>, what: &str, predicate: F) -> Result<()>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(
        Duration::from_millis(STATUS_TIMEOUT_MS),
        status.wait_for(predicate),
    )
    .await
    .with_context(|| format!("timed out waiting for {what}"))?
    .with_context(|| format!("status channel closed while waiting for {what}"))?;
    Ok(())
}

/// Waits for the next notice with the given title, skipping others.
pub async fn wait_for_notice(
    notices: &mut mpsc::UnboundedReceiver<Notice>,
    title: &str,
) -> Result<Notice> {
    tokio::time::timeout(Duration::from_millis(STATUS_TIMEOUT_MS), async {
        loop {
            match notices.recv().await {
                Some(notice) if notice.title == title => return Ok(notice),
                Some(_) => continue,
                None => bail!("notice channel closed"),
            }
        }
    })
    .await
    .with_context(|| format!("timed out waiting for notice '{title}'"))?
}

/// The room code of a host session, once the broker assigns one.
pub async fn host_room_code(handle: &HostHandle) -> Result<String> {
    let mut status = handle.status();
    wait_for(&mut status, "host identity", |status| {
        !status.room.is_unassigned()
    })
    .await?;
    let code = status.borrow().room.to_string();
    Ok(code)
}
