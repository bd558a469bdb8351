use std::time::Duration;

use castroom_core::PeerIdentity;
use castroom_session::LoopbackBroker;

use crate::utils::{host_room_code, spawn_host, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_triggers_ignored_while_reconnect_in_flight() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let mut host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");
    let identity = PeerIdentity::from(room.as_str());

    // Two link losses in quick succession: the second arrives while the
    // in-place reconnect is pending and must not start a second chain.
    broker.set_reconnect_allowed(false);
    broker.drop_broker_link(&identity).await;
    broker.drop_broker_link(&identity).await;

    wait_for_notice(&mut host.notices, "Connection restored")
        .await
        .expect("Session never recovered");
    tokio::time::sleep(Duration::from_secs(60)).await;

    // One in-place attempt fell back to exactly one re-open.
    assert_eq!(host.notifier.count_titled("Connection interrupted").await, 1);
    assert_eq!(host.notifier.count_titled("Connection restored").await, 1);
}
