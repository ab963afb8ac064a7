//! # Outbound Ports
//!
//! Read-only room queries against the contract.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{Address, LedgerError, RoomId, U256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One row of `getAllRooms()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
}

/// One row of `getRoomPlayers(roomId)`.
///
/// Coordinates are exactly as stored on chain; subtract the offset before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOccupant {
    pub address: Address,
    pub name: String,
    pub x: U256,
    pub y: U256,
}

/// Room queries - outbound port.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// `getAllRooms() -> (ids[], names[])`
    async fn get_all_rooms(&self) -> Result<Vec<RoomSummary>, LedgerError>;

    /// `getRoomPlayers(roomId) -> (addresses[], names[], xs[], ys[])`
    async fn get_room_players(&self, room: RoomId) -> Result<Vec<RoomOccupant>, LedgerError>;
}

#[async_trait]
impl<T: RoomDirectory + ?Sized> RoomDirectory for Arc<T> {
    async fn get_all_rooms(&self) -> Result<Vec<RoomSummary>, LedgerError> {
        (**self).get_all_rooms().await
    }

    async fn get_room_players(&self, room: RoomId) -> Result<Vec<RoomOccupant>, LedgerError> {
        (**self).get_room_players(room).await
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock room directory for testing.
#[derive(Clone, Default)]
pub struct MockRoomDirectory {
    rooms: Arc<Mutex<BTreeMap<RoomId, (String, Vec<RoomOccupant>)>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a room.
    pub fn add_room(&self, id: RoomId, name: &str, occupants: Vec<RoomOccupant>) {
        self.rooms.lock().insert(id, (name.to_string(), occupants));
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check(&self) -> Result<(), LedgerError> {
        if *self.should_fail.lock() {
            return Err(LedgerError::Transport("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomDirectory for MockRoomDirectory {
    async fn get_all_rooms(&self) -> Result<Vec<RoomSummary>, LedgerError> {
        self.check()?;
        Ok(self
            .rooms
            .lock()
            .iter()
            .map(|(id, (name, _))| RoomSummary {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn get_room_players(&self, room: RoomId) -> Result<Vec<RoomOccupant>, LedgerError> {
        self.check()?;
        Ok(self
            .rooms
            .lock()
            .get(&room)
            .map(|(_, occupants)| occupants.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_directory() {
        let dir = MockRoomDirectory::new();
        dir.add_room(U256::one(), "lobby", vec![]);
        let rooms = dir.get_all_rooms().await.unwrap();
        assert_eq!(rooms[0].name, "lobby");
        assert!(dir.get_room_players(U256::from(9u64)).await.unwrap().is_empty());

        dir.set_should_fail(true);
        assert!(dir.get_all_rooms().await.is_err());
    }
}
