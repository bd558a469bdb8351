use castroom_session::{HostCommand, LoopbackBroker, NoticeAction};

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_share_prompt_before_capture() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let mut host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    let _viewer = spawn_viewer(&broker, &room).expect("Viewer rejected");

    // A viewer arriving before capture prompts the host to start sharing,
    // with a notice that stays up until acted on.
    let notice = wait_for_notice(&mut host.notices, "New viewer connected")
        .await
        .expect("Share prompt never surfaced");
    assert!(notice.persistent);
    assert_eq!(notice.action, Some(NoticeAction::StartSharing));

    // Accepting the prompt is what starts capture.
    host.handle.send(HostCommand::StartCapture).await;
    let mut status = host.handle.status();
    wait_for(&mut status, "sharing", |status| status.sharing)
        .await
        .expect("Capture never started");
}
