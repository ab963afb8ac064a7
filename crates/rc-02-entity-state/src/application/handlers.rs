//! # Dispatcher Wiring
//!
//! Binds the engine to the event dispatcher and fetches room listings for
//! seeding.

use shared_bus::{Dispatcher, PlayerEntered, PlayerMoved, SubscriptionId};
use shared_types::{LedgerError, RoomId};
use tracing::{debug, warn};

use super::engine::ReconciliationEngine;
use crate::ports::{RoomDirectory, RoomOccupant};

/// Register the engine's handlers for `PlayerEntered` and `PlayerMoved`.
pub fn register_handlers(dispatcher: &mut Dispatcher<ReconciliationEngine>) -> Vec<SubscriptionId> {
    vec![
        dispatcher.on::<PlayerEntered, _>(|engine, payload, event| {
            engine.on_player_entered(payload, event.position);
        }),
        dispatcher.on::<PlayerMoved, _>(|engine, payload, event| {
            engine.on_player_moved(payload, event.position);
        }),
    ]
}

/// A room listing ready to be fed to [`ReconciliationEngine::seed_occupants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSeed {
    pub room: RoomId,
    pub occupants: Vec<RoomOccupant>,
}

/// Fetch the occupants of `room`.
pub async fn fetch_room_seed<D>(directory: &D, room: RoomId) -> Result<RoomSeed, LedgerError>
where
    D: RoomDirectory + ?Sized,
{
    match directory.get_room_players(room).await {
        Ok(occupants) => {
            debug!(room = %room, count = occupants.len(), "Fetched room occupants");
            Ok(RoomSeed { room, occupants })
        }
        Err(e) => {
            warn!(room = %room, error = %e, "Failed to fetch room occupants");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use crate::ports::MockRoomDirectory;
    use shared_bus::{DomainEvent, EventPayload};
    use shared_types::{Address, EventPosition, U256};

    fn me() -> Address {
        Address::new([0xaa; 20])
    }

    fn bob() -> Address {
        Address::new([0xbb; 20])
    }

    #[test]
    fn test_dispatch_through_registered_handlers() {
        let mut dispatcher = Dispatcher::new();
        let ids = register_handlers(&mut dispatcher);
        assert_eq!(ids.len(), 2);

        let mut engine = ReconciliationEngine::new(me(), ReconcileConfig::default()).unwrap();
        let entered = DomainEvent::new(
            EventPosition::new(10, 0),
            EventPayload::PlayerEntered(PlayerEntered {
                player: me(),
                room_id: U256::one(),
                name: "me".to_string(),
            }),
        );
        assert_eq!(dispatcher.publish(&mut engine, &entered), 1);

        let moved = DomainEvent::new(
            EventPosition::new(11, 0),
            EventPayload::PlayerMoved(PlayerMoved {
                player: bob(),
                room_id: U256::one(),
                x: U256::from(10_050u64),
                y: U256::from(10_000u64),
            }),
        );
        dispatcher.publish(&mut engine, &moved);

        assert_eq!(engine.current_room(), Some(U256::one()));
        assert_eq!(engine.store().len(), 2);
        assert!(engine.store().find(&bob()).is_some());
    }

    #[tokio::test]
    async fn test_fetch_room_seed() {
        let directory = MockRoomDirectory::new();
        directory.add_room(
            U256::one(),
            "lobby",
            vec![RoomOccupant {
                address: bob(),
                name: "bob".to_string(),
                x: U256::from(10_000u64),
                y: U256::from(10_000u64),
            }],
        );

        let seed = fetch_room_seed(&directory, U256::one()).await.unwrap();
        assert_eq!(seed.occupants.len(), 1);

        directory.set_should_fail(true);
        assert!(fetch_room_seed(&directory, U256::one()).await.is_err());
    }
}
