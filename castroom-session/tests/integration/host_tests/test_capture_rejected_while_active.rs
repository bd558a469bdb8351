use std::time::Duration;

use castroom_session::{HostCommand, LoopbackBroker, MediaTrack};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for};

#[tokio::test(start_paused = true)]
async fn test_capture_rejected_while_active() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    let viewer = spawn_viewer(&broker, &room).expect("Viewer rejected");

    let mut status = host.handle.status();
    wait_for(&mut status, "viewer joined", |status| status.viewers.len() == 1)
        .await
        .expect("Viewer never joined");

    host.handle.send(HostCommand::StartCapture).await;
    wait_for(&mut status, "sharing", |status| status.sharing)
        .await
        .expect("Capture never started");

    let mut viewer_status = viewer.handle.status();
    wait_for(&mut viewer_status, "stream", |status| status.has_stream)
        .await
        .expect("Viewer never got the stream");

    // A second start while one capture is active is rejected without
    // touching the existing session.
    host.handle.send(HostCommand::StartCapture).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(host.capture.acquisitions(), 1);
    let track = host.capture.last_video_track().expect("No capture track");
    assert!(!track.is_ended());
    assert!(status.borrow().sharing);
    assert!(viewer_status.borrow().has_stream);
    assert_eq!(broker.call_count(), 1);
}
