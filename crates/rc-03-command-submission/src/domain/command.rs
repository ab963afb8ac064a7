//! # Room Commands
//!
//! The three contract writes and the event each one is expected to emit.

use serde::{Deserialize, Serialize};
use shared_bus::EventSignature;
use shared_types::abi::{self, Token};
use shared_types::{RoomId, U256};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

use super::receipt::PendingHandle;

/// A contract write issued by the local actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomCommand {
    /// `createRoom(string) -> roomId`
    CreateRoom { name: String },
    /// `enterRoom(uint256,string) -> bool`
    EnterRoom { room_id: RoomId, name: String },
    /// `move(uint256,uint256)` with offset-encoded coordinates.
    Move { x: U256, y: U256 },
}

impl RoomCommand {
    /// Short name, used as a metric label.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create_room",
            Self::EnterRoom { .. } => "enter_room",
            Self::Move { .. } => "move",
        }
    }

    /// Canonical function signature.
    pub const fn function(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom(string)",
            Self::EnterRoom { .. } => "enterRoom(uint256,string)",
            Self::Move { .. } => "move(uint256,uint256)",
        }
    }

    /// The event whose presence in the receipt confirms this command.
    pub const fn expected_signature(&self) -> EventSignature {
        match self {
            Self::CreateRoom { .. } => EventSignature::RoomCreated,
            Self::EnterRoom { .. } => EventSignature::PlayerEntered,
            Self::Move { .. } => EventSignature::PlayerMoved,
        }
    }

    /// ABI-encoded call data: selector followed by the arguments.
    pub fn calldata(&self) -> Vec<u8> {
        let args = match self {
            Self::CreateRoom { name } => vec![Token::String(name.clone())],
            Self::EnterRoom { room_id, name } => {
                vec![Token::Uint(*room_id), Token::String(name.clone())]
            }
            Self::Move { x, y } => vec![Token::Uint(*x), Token::Uint(*y)],
        };
        abi::encode_call(self.function(), &args)
    }
}

impl fmt::Display for RoomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateRoom { name } => write!(f, "createRoom({name:?})"),
            Self::EnterRoom { room_id, name } => write!(f, "enterRoom({room_id}, {name:?})"),
            Self::Move { x, y } => write!(f, "move({x}, {y})"),
        }
    }
}

/// A submitted command awaiting its receipt.
///
/// Lives only for the duration of the submitting call.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub submitted_at: Instant,
    pub expected: EventSignature,
    pub handle: PendingHandle,
    pub correlation_id: Uuid,
}

impl PendingCommand {
    pub fn new(expected: EventSignature, handle: PendingHandle, correlation_id: Uuid) -> Self {
        Self {
            submitted_at: Instant::now(),
            expected,
            handle,
            correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::abi::{decode, decode_uint, selector, AbiType};

    #[test]
    fn test_move_calldata() {
        let cmd = RoomCommand::Move {
            x: U256::from(10_012u64),
            y: U256::from(9_996u64),
        };
        let data = cmd.calldata();
        assert_eq!(&data[..4], &selector("move(uint256,uint256)"));
        assert_eq!(decode_uint(&data[4..], 0).unwrap(), U256::from(10_012u64));
        assert_eq!(decode_uint(&data[4..], 1).unwrap(), U256::from(9_996u64));
        assert_eq!(cmd.expected_signature(), EventSignature::PlayerMoved);
    }

    #[test]
    fn test_enter_room_calldata() {
        let cmd = RoomCommand::EnterRoom {
            room_id: U256::from(7u64),
            name: "alice".to_string(),
        };
        let data = cmd.calldata();
        let tokens = decode(&[AbiType::Uint256, AbiType::String], &data[4..]).unwrap();
        assert_eq!(tokens[0], Token::Uint(U256::from(7u64)));
        assert_eq!(tokens[1], Token::String("alice".to_string()));
        assert_eq!(cmd.name(), "enter_room");
    }

    #[test]
    fn test_create_room_expects_room_created() {
        let cmd = RoomCommand::CreateRoom {
            name: "lobby".to_string(),
        };
        assert_eq!(cmd.expected_signature(), EventSignature::RoomCreated);
        assert_eq!(cmd.to_string(), "createRoom(\"lobby\")");
    }
}
