use std::time::Duration;

use castroom_core::PeerIdentity;
use castroom_session::{LoopbackBroker, NoticeKind};

use crate::utils::{host_room_code, spawn_host, wait_for};

#[tokio::test(start_paused = true)]
async fn test_in_place_reconnect_preserves_identity() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    let host = spawn_host(&broker);
    let room = host_room_code(&host.handle).await.expect("No room code");

    // The socket drops but the broker accepts the in-place revival: the
    // identity survives and no retry attempt is consumed.
    broker.drop_broker_link(&PeerIdentity::from(room.as_str())).await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let mut status = host.handle.status();
    wait_for(&mut status, "identity kept", |status| {
        status.room == PeerIdentity::from(room.as_str())
    })
    .await
    .expect("Identity changed across in-place reconnect");

    assert_eq!(host.notifier.count_kind(NoticeKind::Progress).await, 0);
    assert_eq!(host.notifier.count_kind(NoticeKind::Destructive).await, 0);
    assert_eq!(broker.peer_count(), 1);
}
