use std::sync::Arc;

use castroom_core::{BrokerConfig, RoomCodeError};
use castroom_session::{DummySink, InteractionFlag, LoopbackBroker, ViewerSession};

use crate::utils::RecordingNotifier;

#[tokio::test(start_paused = true)]
async fn test_room_code_validation() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();

    for bad_input in ["", "   ", "\t\n"] {
        let (notifier, _notices) = RecordingNotifier::new();
        let result = ViewerSession::join(
            Arc::new(broker.clone()),
            BrokerConfig::default(),
            bad_input,
            Arc::new(DummySink::new()),
            notifier,
            Arc::new(InteractionFlag::new()),
        );
        assert!(matches!(result, Err(RoomCodeError::Empty)));
    }

    // Rejected before any network attempt: the broker never saw a peer.
    assert_eq!(broker.peer_count(), 0);
}
