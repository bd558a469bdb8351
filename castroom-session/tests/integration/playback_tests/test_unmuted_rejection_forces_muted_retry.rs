use castroom_session::{HostCommand, LoopbackBroker, VideoSink, ViewerCommand};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for};

#[tokio::test(start_paused = true)]
async fn test_unmuted_rejection_forces_muted_retry() {
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

    let mut viewer_status = viewer.handle.status();
    wait_for(&mut viewer_status, "stream", |status| status.has_stream)
        .await
        .expect("Viewer never got the stream");

    // The user unmutes while the stream is already playing.
    viewer.handle.send(ViewerCommand::ToggleMute).await;
    wait_for(&mut viewer_status, "unmuted", |status| !status.playback.muted)
        .await
        .expect("Toggle never unmuted");

    // The stream is renegotiated; the unmuted attempt is rejected by the
    // policy, so playback falls back to muted and parks the unmute.
    host.handle.send(HostCommand::StopCapture).await;
    wait_for(&mut viewer_status, "stream gone", |status| !status.has_stream)
        .await
        .expect("Stream never cleared");
    host.handle.send(HostCommand::StartCapture).await;
    wait_for(&mut viewer_status, "stream back", |status| status.has_stream)
        .await
        .expect("Stream never returned");

    let playback = viewer_status.borrow().playback;
    assert!(playback.muted);
    assert!(playback.pending_user_interaction);
    assert!(!viewer.sink.is_paused());
    assert!(viewer.sink.is_muted());
}
