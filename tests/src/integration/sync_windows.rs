//! # Poller Windowing Flows
//!
//! `EventPoller` against the in-memory ledger, which rejects any log query
//! spanning more than 20 blocks just like a real node with a range cap.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use client_runtime::InMemoryLedger;
    use rc_01_event_sync::{EventPoller, PollerConfig, MAX_WINDOW_SIZE};
    use rc_03_command_submission::RoomCommand;
    use shared_bus::{DomainEvent, EventPayload, EventSignature};
    use shared_types::{encode_point, Address, U256};

    fn contract() -> Address {
        Address::new([0x5f; 20])
    }

    fn walker() -> Address {
        Address::new([0xbb; 20])
    }

    /// A room with one player who has moved `moves` times, separated by
    /// `gap` empty blocks each.
    fn busy_ledger(moves: u64, gap: u64) -> InMemoryLedger {
        let ledger = InMemoryLedger::new(contract(), walker());
        ledger
            .act_as(walker(), &RoomCommand::CreateRoom { name: "lobby".to_string() })
            .unwrap();
        ledger
            .act_as(
                walker(),
                &RoomCommand::EnterRoom {
                    room_id: U256::one(),
                    name: "walker".to_string(),
                },
            )
            .unwrap();
        for i in 0..moves {
            ledger.mine_empty(gap);
            let (x, y) = encode_point(i as f64, 0.0).unwrap();
            ledger.act_as(walker(), &RoomCommand::Move { x, y }).unwrap();
        }
        ledger
    }

    fn poller(ledger: &InMemoryLedger, window_size: u64) -> EventPoller<InMemoryLedger> {
        EventPoller::new(
            Arc::new(ledger.clone()),
            contract(),
            EventSignature::PlayerMoved,
            PollerConfig {
                window_size,
                from_block: Some(0),
                ..PollerConfig::for_testing()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_catch_up_covers_history_in_bounded_windows() {
        let ledger = busy_ledger(6, 9);
        let head = ledger.head();
        assert!(head > 3 * MAX_WINDOW_SIZE);

        let mut poller = poller(&ledger, MAX_WINDOW_SIZE);
        let mut sink: Vec<DomainEvent> = Vec::new();
        let report = poller.poll_cycle(&mut sink).await.unwrap();

        assert_eq!(report.windows.first().unwrap().from, 1);
        assert_eq!(report.windows.last().unwrap().to, head);
        for pair in report.windows.windows(2) {
            assert_eq!(pair[1].from, pair[0].to + 1);
        }
        assert!(report
            .windows
            .iter()
            .all(|w| w.to - w.from + 1 <= MAX_WINDOW_SIZE));
        assert_eq!(poller.watermark(), Some(head));

        assert_eq!(sink.len(), 6);
        let xs: Vec<U256> = sink
            .iter()
            .map(|e| match &e.payload {
                EventPayload::PlayerMoved(m) => m.x,
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        let expected: Vec<U256> = (0..6u64).map(|i| U256::from(10_000 + i)).collect();
        assert_eq!(xs, expected);
        assert!(sink.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[tokio::test]
    async fn test_small_windows_see_the_same_events() {
        let ledger = busy_ledger(4, 3);

        let mut wide: Vec<DomainEvent> = Vec::new();
        poller(&ledger, MAX_WINDOW_SIZE).poll_cycle(&mut wide).await.unwrap();

        let mut narrow: Vec<DomainEvent> = Vec::new();
        let report = poller(&ledger, 1).poll_cycle(&mut narrow).await.unwrap();

        assert_eq!(report.windows.len() as u64, ledger.head());
        assert_eq!(wide, narrow);
    }

    #[tokio::test]
    async fn test_nothing_new_means_no_queries() {
        let ledger = busy_ledger(2, 0);
        let mut poller = poller(&ledger, MAX_WINDOW_SIZE);
        let mut sink: Vec<DomainEvent> = Vec::new();

        poller.poll_cycle(&mut sink).await.unwrap();
        let report = poller.poll_cycle(&mut sink).await.unwrap();

        assert!(report.windows.is_empty());
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_running_poller_picks_up_new_blocks() {
        let ledger = busy_ledger(1, 0);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = poller(&ledger, MAX_WINDOW_SIZE).start(tx);

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.signature(), EventSignature::PlayerMoved);

        ledger.mine_empty(30);
        let (x, y) = encode_point(42.0, 0.0).unwrap();
        ledger.act_as(walker(), &RoomCommand::Move { x, y }).unwrap();

        let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(second.position > first.position);

        let stopped = handle.stop().await.unwrap();
        assert_eq!(stopped.watermark(), Some(ledger.head()));
    }
}
