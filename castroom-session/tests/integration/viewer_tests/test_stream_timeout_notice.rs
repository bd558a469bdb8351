use std::time::Duration;

use castroom_session::{HostCommand, LoopbackBroker};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_stream_timeout_notice() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    // The call is answered but the host never actually delivers media.
    broker.set_hold_streams(true);

    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    let mut viewer = spawn_viewer(&broker, &room).expect("Viewer rejected");

    let mut status = host.handle.status();
    wait_for(&mut status, "viewer joined", |status| status.viewers.len() == 1)
        .await
        .expect("Viewer never joined");
    host.handle.send(HostCommand::StartCapture).await;

    // The arrival window elapses with no stream: one non-fatal notice.
    let notice = wait_for_notice(&mut viewer.notices, "No stream yet")
        .await
        .expect("Timeout notice never surfaced");
    assert!(notice.body.contains("has not started sharing"));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(viewer.notifier.count_titled("No stream yet").await, 1);

    let viewer_status = viewer.handle.status();
    assert!(!viewer_status.borrow().has_stream);
}
