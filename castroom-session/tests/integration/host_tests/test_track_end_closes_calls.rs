use castroom_session::{HostCommand, LoopbackBroker, MediaTrack};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for};

#[tokio::test(start_paused = true)]
async fn test_track_end_closes_calls() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    let viewer_a = spawn_viewer(&broker, &room).expect("Viewer a rejected");
    let viewer_b = spawn_viewer(&broker, &room).expect("Viewer b rejected");

    let mut status = host.handle.status();
    wait_for(&mut status, "two viewers", |status| status.viewers.len() == 2)
        .await
        .expect("Viewers never joined");

    host.handle.send(HostCommand::StartCapture).await;

    let mut a_status = viewer_a.handle.status();
    wait_for(&mut a_status, "stream at viewer a", |status| status.has_stream)
        .await
        .expect("Viewer a never got the stream");
    let mut b_status = viewer_b.handle.status();
    wait_for(&mut b_status, "stream at viewer b", |status| status.has_stream)
        .await
        .expect("Viewer b never got the stream");

    // The browser's own "Stop sharing" affordance ends the track: every
    // call closes, every local track stops, membership is untouched.
    let track = host.capture.last_video_track().expect("No capture track");
    track.end_remotely();

    wait_for(&mut status, "capture released", |status| !status.sharing)
        .await
        .expect("Capture never ended");
    wait_for(&mut a_status, "stream gone at viewer a", |status| !status.has_stream)
        .await
        .expect("Viewer a kept the stream");
    wait_for(&mut b_status, "stream gone at viewer b", |status| !status.has_stream)
        .await
        .expect("Viewer b kept the stream");

    assert_eq!(broker.call_count(), 0);
    assert_eq!(status.borrow().viewers.len(), 2);
    assert!(track.is_ended());
}
