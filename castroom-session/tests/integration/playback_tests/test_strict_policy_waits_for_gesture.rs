use std::sync::Arc;
use std::time::Duration;

use castroom_session::{DummySink, HostCommand, LoopbackBroker, VideoSink, ViewerCommand};

use crate::utils::{host_room_code, spawn_host, spawn_viewer_with_sink, wait_for, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_strict_policy_waits_for_gesture() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    // The strict policy: no playback at all before a user gesture.
    let sink = Arc::new(DummySink::new());
    sink.set_reject_all(true);
    let mut viewer = spawn_viewer_with_sink(&broker, &room, sink).expect("Viewer rejected");

    let mut status = host.handle.status();
    wait_for(&mut status, "viewer joined", |status| status.viewers.len() == 1)
        .await
        .expect("Viewer never joined");
    host.handle.send(HostCommand::StartCapture).await;

    let mut viewer_status = viewer.handle.status();
    wait_for(&mut viewer_status, "pending interaction", |status| {
        status.playback.pending_user_interaction
    })
    .await
    .expect("Playback never parked");

    // One tap-to-start notice, no auto-retry loop.
    wait_for_notice(&mut viewer.notices, "Playback paused")
        .await
        .expect("Tap notice never surfaced");
    let attempts_before = viewer.sink.play_attempts();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(viewer.sink.play_attempts(), attempts_before);
    assert_eq!(viewer.notifier.count_titled("Playback paused").await, 1);

    // The tap is the unmute gesture; the flags flip whether or not the
    // resulting play call succeeds.
    viewer.handle.send(ViewerCommand::SurfaceTapped).await;
    wait_for(&mut viewer_status, "unmuted", |status| !status.playback.muted)
        .await
        .expect("Gesture never unmuted");

    let playback = viewer_status.borrow().playback;
    assert!(!playback.pending_user_interaction);
    assert!(playback.user_has_interacted);
    assert!(viewer.sink.is_paused());
}
