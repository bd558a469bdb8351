use castroom_session::{HostCommand, LoopbackBroker, ViewerCommand};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for};

#[tokio::test(start_paused = true)]
async fn test_viewer_leave_closes_only_their_call() {
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

    let mut b_status = viewer_b.handle.status();
    wait_for(&mut b_status, "stream at viewer b", |status| status.has_stream)
        .await
        .expect("Viewer b never got the stream");

    // One departure closes only that viewer's call; capture and the other
    // call are untouched.
    viewer_a.handle.send(ViewerCommand::Leave).await;
    viewer_a.task.await.expect("Viewer a task panicked");

    wait_for(&mut status, "one viewer left", |status| status.viewers.len() == 1)
        .await
        .expect("Registry never shrank");
    assert_eq!(broker.call_count(), 1);
    assert!(status.borrow().sharing);
    assert!(b_status.borrow().has_stream);
}
