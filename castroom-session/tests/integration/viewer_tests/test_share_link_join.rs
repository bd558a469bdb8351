use castroom_core::{RoomCode, room_from_link, share_link};
use castroom_session::LoopbackBroker;

use crate::utils::{host_room_code, spawn_host, spawn_viewer, wait_for, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_share_link_join() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    // The share link embeds the room code and round-trips through the
    // parser, the path a scanned link takes.
    let code = RoomCode::parse(&room).expect("Host code invalid");
    let link = share_link("https://example.app", &code);
    assert_eq!(link, format!("https://example.app/join?room={room}"));
    let parsed = room_from_link(&link).expect("Link lost the room code");

    let mut viewer = spawn_viewer(&broker, parsed.as_str()).expect("Viewer rejected");

    let mut viewer_status = viewer.handle.status();
    wait_for(&mut viewer_status, "link open", |status| status.connected)
        .await
        .expect("Viewer never connected");

    wait_for_notice(&mut viewer.notices, "Connected")
        .await
        .expect("Connected notice never surfaced");

    let mut host_status = host.handle.status();
    wait_for(&mut host_status, "registry add", |status| status.viewers.len() == 1)
        .await
        .expect("Host registry never grew");
}
