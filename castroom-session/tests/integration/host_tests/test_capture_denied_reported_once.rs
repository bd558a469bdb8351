use std::time::Duration;

use castroom_session::{HostCommand, LoopbackBroker};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_capture_denied_reported_once() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let mut host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    let _viewer = spawn_viewer(&broker, &room).expect("Viewer rejected");

    let mut status = host.handle.status();
    wait_for(&mut status, "viewer joined", |status| status.viewers.len() == 1)
        .await
        .expect("Viewer never joined");

    // The user declines the capture prompt: reported once, not retried.
    host.capture.set_denied(true);
    host.handle.send(HostCommand::StartCapture).await;
    wait_for_notice(&mut host.notices, "Sharing failed")
        .await
        .expect("Denial never surfaced");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(host.notifier.count_titled("Sharing failed").await, 1);
    assert!(!status.borrow().sharing);
    assert_eq!(status.borrow().viewers.len(), 1);
    assert_eq!(host.capture.acquisitions(), 0);

    // Re-invoking sharing after the user allows it works normally.
    host.capture.set_denied(false);
    host.handle.send(HostCommand::StartCapture).await;
    wait_for(&mut status, "sharing", |status| status.sharing)
        .await
        .expect("Capture never started");
}
