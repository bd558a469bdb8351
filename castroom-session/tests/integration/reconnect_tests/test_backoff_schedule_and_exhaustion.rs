use std::time::Duration;

use castroom_session::{LoopbackBroker, NoticeKind};

use crate::utils::{spawn_host, wait_for_notice};

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_and_exhaustion() {
    crate::init_tracing();

    let broker = LoopbackBroker::new();
    // The broker stays unreachable for the whole chain.
    broker.fail_next_opens(100);

    let mut host = spawn_host(&broker);

    wait_for_notice(&mut host.notices, "Unable to connect")
        .await
        .expect("Terminal notice never surfaced");

    // No further automatic retry after exhaustion.
    tokio::time::sleep(Duration::from_secs(300)).await;

    // Delay for attempt k is min(1000 * 2^k, 30000) ms.
    assert_eq!(
        host.notifier.progress_durations().await,
        vec![
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(2)),
            Some(Duration::from_secs(4)),
            Some(Duration::from_secs(8)),
            Some(Duration::from_secs(16)),
        ]
    );

    let all = host.notifier.all().await;
    let bodies: Vec<_> = all
        .iter()
        .filter(|notice| notice.kind == NoticeKind::Progress)
        .map(|notice| notice.body.as_str())
        .collect();
    assert_eq!(bodies.len(), 5);
    for (index, body) in bodies.iter().enumerate() {
        assert!(body.contains(&format!("({}/5)", index + 1)));
    }

    // The terminal failure fires exactly once.
    assert_eq!(host.notifier.count_kind(NoticeKind::Destructive).await, 1);
}
