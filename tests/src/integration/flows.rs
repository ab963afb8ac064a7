//! # Integration Test Flows
//!
//! A full client session (pollers, dispatcher, reconciliation engine and
//! submitter) against the in-memory ledger, with other players driven
//! directly on the ledger.
//!
//! ## Flows Tested:
//!
//! 1. **Entry**: entering a room seeds players already inside it
//! 2. **Remote movement**: a polled `PlayerMoved` walks the entity, never teleports
//! 3. **Local movement**: predicted immediately, confirmed from the receipt and
//!    again from the poller without double-applying
//! 4. **Room switch**: entering another room drops the previous occupants
//! 5. **Failures**: reverted commands surface on the output channel

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use client_runtime::{
        ClientCommand, ClientConfig, ClientSession, InMemoryLedger,
    };
    use rc_01_event_sync::{decode_any, PollerConfig};
    use rc_02_entity_state::{EventEffect, MovementStatus, Point, ReconcileConfig, ReconciliationEngine};
    use rc_03_command_submission::{RoomCommand, SubmitterConfig};
    use shared_types::{encode_point, Address, U256};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn me() -> Address {
        Address::new([0xaa; 20])
    }

    fn bob() -> Address {
        Address::new([0xbb; 20])
    }

    fn carol() -> Address {
        Address::new([0xcc; 20])
    }

    fn contract() -> Address {
        Address::new([0x5f; 20])
    }

    fn test_config() -> ClientConfig {
        let mut config = ClientConfig {
            contract: Some(contract()),
            account: Some(me()),
            ..ClientConfig::default()
        };
        config.poller = PollerConfig {
            from_block: Some(0),
            ..PollerConfig::for_testing()
        };
        config.submitter = SubmitterConfig::for_testing();
        config
    }

    struct Harness {
        session: ClientSession<InMemoryLedger>,
        ledger: InMemoryLedger,
        output: mpsc::UnboundedReceiver<String>,
    }

    impl Harness {
        fn start() -> Self {
            let ledger = InMemoryLedger::new(contract(), me());
            let (tx, output) = mpsc::unbounded_channel();
            let mut session = ClientSession::new(Arc::new(ledger.clone()), &test_config(), tx).unwrap();
            session.start_pollers().unwrap();
            Self {
                session,
                ledger,
                output,
            }
        }

        /// Handle events and updates until nothing arrives for a while.
        async fn settle(&mut self) {
            while self.session.process_next(Duration::from_millis(150)).await {}
        }

        fn act(&self, who: Address, command: RoomCommand) {
            self.ledger.act_as(who, &command).unwrap();
        }

        fn create_room(&self, who: Address, name: &str) {
            self.act(
                who,
                RoomCommand::CreateRoom {
                    name: name.to_string(),
                },
            );
        }

        fn enter(&self, who: Address, room: u64, name: &str) {
            self.act(
                who,
                RoomCommand::EnterRoom {
                    room_id: U256::from(room),
                    name: name.to_string(),
                },
            );
        }

        fn move_to(&self, who: Address, x: f64, y: f64) {
            let (x, y) = encode_point(x, y).unwrap();
            self.act(who, RoomCommand::Move { x, y });
        }

        async fn enter_self(&mut self, room: u64) {
            self.session.execute(ClientCommand::Enter {
                room: U256::from(room),
                name: "me".to_string(),
            });
            self.settle().await;
        }

        fn drain_output(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(line) = self.output.try_recv() {
                lines.push(line);
            }
            lines
        }
    }

    // =============================================================================
    // ENTRY AND SEEDING
    // =============================================================================

    #[tokio::test]
    async fn test_entry_seeds_existing_occupants() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.enter(bob(), 1, "bob");
        h.move_to(bob(), 12.7, -3.2);

        h.enter_self(1).await;

        let engine = h.session.engine();
        assert_eq!(engine.current_room(), Some(U256::one()));
        assert_eq!(engine.store().len(), 2);
        let bob_entity = engine.store().find(&bob()).unwrap();
        assert_eq!(bob_entity.name, "bob");
        assert_eq!(bob_entity.position, Point::new(12.0, -4.0));
        assert_eq!(engine.store().get_self().unwrap().position, Point::ORIGIN);
    }

    #[tokio::test]
    async fn test_players_in_other_rooms_are_not_tracked() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.create_room(carol(), "attic");
        h.enter(carol(), 2, "carol");

        h.enter_self(1).await;
        h.move_to(carol(), 5.0, 5.0);
        h.settle().await;

        assert!(h.session.engine().store().find(&carol()).is_none());
        assert_eq!(h.session.engine().store().len(), 1);
    }

    // =============================================================================
    // REMOTE MOVEMENT
    // =============================================================================

    #[tokio::test]
    async fn test_remote_player_walks_instead_of_teleporting() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.enter(bob(), 1, "bob");
        h.enter_self(1).await;

        h.move_to(bob(), 60.0, 80.0);
        h.settle().await;

        let bob_entity = h.session.engine().store().find(&bob()).unwrap();
        assert_eq!(bob_entity.position, Point::ORIGIN);
        assert_eq!(bob_entity.target, Some(Point::new(60.0, 80.0)));
        assert_eq!(
            bob_entity.last_confirmed.unwrap().point,
            Point::new(60.0, 80.0)
        );

        // Default speed is 100 units/s; the path is 100 units long.
        h.session.step(0.5);
        let bob_entity = h.session.engine().store().find(&bob()).unwrap();
        assert!((bob_entity.position.x - 30.0).abs() < 1e-9);
        assert!((bob_entity.position.y - 40.0).abs() < 1e-9);
        assert_eq!(bob_entity.movement_status, MovementStatus::Walking);

        h.session.step(0.6);
        let bob_entity = h.session.engine().store().find(&bob()).unwrap();
        assert_eq!(bob_entity.position, Point::new(60.0, 80.0));
        assert_eq!(bob_entity.movement_status, MovementStatus::Idle);
    }

    #[tokio::test]
    async fn test_later_move_retargets_from_current_position() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.enter(bob(), 1, "bob");
        h.enter_self(1).await;

        h.move_to(bob(), 100.0, 0.0);
        h.settle().await;
        h.session.step(0.5);

        h.move_to(bob(), 50.0, 50.0);
        h.settle().await;

        let bob_entity = h.session.engine().store().find(&bob()).unwrap();
        assert_eq!(bob_entity.position, Point::new(50.0, 0.0));
        assert_eq!(bob_entity.target, Some(Point::new(50.0, 50.0)));
    }

    // =============================================================================
    // LOCAL MOVEMENT
    // =============================================================================

    #[tokio::test]
    async fn test_self_move_predicted_then_confirmed() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.enter_self(1).await;
        h.drain_output();

        h.session.execute(ClientCommand::Move { x: 25.0, y: -10.0 });
        let predicted = h.session.engine().store().get_self().unwrap();
        assert_eq!(predicted.target, Some(Point::new(25.0, -10.0)));
        assert!(predicted.last_confirmed.is_none());

        h.settle().await;
        let confirmed = h.session.engine().store().get_self().unwrap();
        assert_eq!(confirmed.last_confirmed.unwrap().point, Point::new(25.0, -10.0));
        assert!(h
            .drain_output()
            .iter()
            .any(|line| line.starts_with("move confirmed")));

        h.session.step(1.0);
        assert_eq!(
            h.session.engine().store().get_self().unwrap().position,
            Point::new(25.0, -10.0)
        );
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_idempotent() {
        let ledger = InMemoryLedger::new(contract(), me());
        ledger
            .act_as(bob(), &RoomCommand::CreateRoom { name: "lobby".to_string() })
            .unwrap();
        let entered = ledger
            .act_as(
                me(),
                &RoomCommand::EnterRoom {
                    room_id: U256::one(),
                    name: "me".to_string(),
                },
            )
            .unwrap();
        let (x, y) = encode_point(7.0, 9.0).unwrap();
        let moved = ledger.act_as(me(), &RoomCommand::Move { x, y }).unwrap();

        let entered = decode_any(&entered.logs[0]).unwrap().unwrap();
        let moved = decode_any(&moved.logs[0]).unwrap().unwrap();

        let mut engine = ReconciliationEngine::new(me(), ReconcileConfig::default()).unwrap();
        assert_eq!(engine.apply(&entered), EventEffect::Created);
        assert_eq!(engine.apply(&entered), EventEffect::Duplicate);
        assert_eq!(engine.apply(&moved), EventEffect::SelfConfirmed);
        assert_eq!(engine.apply(&moved), EventEffect::Duplicate);

        let me_entity = engine.store().get_self().unwrap();
        assert_eq!(me_entity.last_confirmed.unwrap().point, Point::new(7.0, 9.0));
        assert_eq!(me_entity.last_confirmed.unwrap().at, moved.position);
    }

    // =============================================================================
    // ROOM SWITCH AND FAILURES
    // =============================================================================

    #[tokio::test]
    async fn test_switching_rooms_drops_previous_occupants() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.enter(bob(), 1, "bob");
        h.create_room(carol(), "attic");
        h.enter(carol(), 2, "carol");

        h.enter_self(1).await;
        assert!(h.session.engine().store().find(&bob()).is_some());

        h.enter_self(2).await;
        let store = h.session.engine().store();
        assert_eq!(h.session.engine().current_room(), Some(U256::from(2u64)));
        assert!(store.find(&bob()).is_none());
        assert!(store.find(&carol()).is_some());
        assert!(store.get_self().is_some());
    }

    #[tokio::test]
    async fn test_entering_missing_room_reports_failure() {
        let mut h = Harness::start();
        h.enter_self(7).await;

        assert_eq!(h.session.engine().current_room(), None);
        assert!(h
            .drain_output()
            .iter()
            .any(|line| line.starts_with("enter_room failed")));
    }

    #[tokio::test]
    async fn test_create_reports_room_id() {
        let mut h = Harness::start();
        h.create_room(bob(), "lobby");
        h.session.execute(ClientCommand::Create {
            name: "den".to_string(),
        });
        h.settle().await;

        assert!(h
            .drain_output()
            .iter()
            .any(|line| line == "room 2 created"));
    }
}
