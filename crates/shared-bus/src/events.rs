//! # Domain Events
//!
//! The closed set of contract events this client understands, and the typed
//! union they decode into.
//!
//! ## Signatures
//!
//! | Event | Canonical signature | Indexed | Data |
//! |-------|---------------------|---------|------|
//! | `RoomCreated` | `RoomCreated(address,uint256)` | creator, roomId | none |
//! | `PlayerEntered` | `PlayerEntered(address,uint256,string)` | player, roomId | name |
//! | `PlayerMoved` | `PlayerMoved(address,uint256,uint256,uint256)` | player, roomId | posX, posY |

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Address, EventPosition, Hash, RoomId, U256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    /// Signature topics, indexed like [`EventSignature::ALL`].
    static ref TOPICS: [Hash; 3] =
        EventSignature::ALL.map(|sig| keccak256(sig.canonical().as_bytes()));
}

/// A recognized contract event signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSignature {
    /// A room was created.
    RoomCreated,
    /// A player entered a room.
    PlayerEntered,
    /// A player moved inside a room.
    PlayerMoved,
}

impl EventSignature {
    /// Every recognized signature, in declaration order.
    pub const ALL: [Self; 3] = [Self::RoomCreated, Self::PlayerEntered, Self::PlayerMoved];

    /// Short event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated => "RoomCreated",
            Self::PlayerEntered => "PlayerEntered",
            Self::PlayerMoved => "PlayerMoved",
        }
    }

    /// Canonical Solidity signature hashed into the topic.
    #[must_use]
    pub const fn canonical(&self) -> &'static str {
        match self {
            Self::RoomCreated => "RoomCreated(address,uint256)",
            Self::PlayerEntered => "PlayerEntered(address,uint256,string)",
            Self::PlayerMoved => "PlayerMoved(address,uint256,uint256,uint256)",
        }
    }

    /// Topic (`topics[0]`) carried by logs of this event.
    #[must_use]
    pub fn topic(&self) -> Hash {
        TOPICS[*self as usize]
    }

    /// Reverse lookup from a signature topic.
    #[must_use]
    pub fn from_topic(topic: &Hash) -> Option<Self> {
        TOPICS
            .iter()
            .position(|cached| cached == topic)
            .map(|idx| Self::ALL[idx])
    }
}

impl fmt::Display for EventSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event name outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown event signature: {0}")]
pub struct UnknownSignature(pub String);

impl FromStr for EventSignature {
    type Err = UnknownSignature;

    /// Accepts either the short name or the canonical signature.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|sig| sig.name() == trimmed || sig.canonical() == trimmed)
            .ok_or_else(|| UnknownSignature(s.to_string()))
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// `RoomCreated(address indexed creator, uint256 indexed roomId)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreated {
    pub creator: Address,
    pub room_id: RoomId,
}

/// `PlayerEntered(address indexed player, uint256 indexed roomId, string name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntered {
    pub player: Address,
    pub room_id: RoomId,
    pub name: String,
}

/// `PlayerMoved(address indexed player, uint256 indexed roomId, uint256 posX, uint256 posY)`
///
/// Coordinates are kept exactly as stored on chain (offset-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub player: Address,
    pub room_id: RoomId,
    pub x: U256,
    pub y: U256,
}

/// Typed arguments of a decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    RoomCreated(RoomCreated),
    PlayerEntered(PlayerEntered),
    PlayerMoved(PlayerMoved),
}

impl EventPayload {
    /// Signature this payload was decoded from.
    #[must_use]
    pub const fn signature(&self) -> EventSignature {
        match self {
            Self::RoomCreated(_) => EventSignature::RoomCreated,
            Self::PlayerEntered(_) => EventSignature::PlayerEntered,
            Self::PlayerMoved(_) => EventSignature::PlayerMoved,
        }
    }

    /// Room the event belongs to.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::RoomCreated(e) => e.room_id,
            Self::PlayerEntered(e) => e.room_id,
            Self::PlayerMoved(e) => e.room_id,
        }
    }
}

/// A decoded event together with where it sits in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// `(block_number, log_index)` of the originating log.
    pub position: EventPosition,
    /// Transaction that emitted the log, if known.
    pub transaction_hash: Option<Hash>,
    /// Decoded arguments.
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Create an event at the given ledger position.
    #[must_use]
    pub fn new(position: EventPosition, payload: EventPayload) -> Self {
        Self {
            position,
            transaction_hash: None,
            payload,
        }
    }

    /// Attach the originating transaction hash.
    #[must_use]
    pub fn with_transaction(mut self, hash: Option<Hash>) -> Self {
        self.transaction_hash = hash;
        self
    }

    #[must_use]
    pub const fn signature(&self) -> EventSignature {
        self.payload.signature()
    }
}

/// Payload types that can be pulled out of a [`DomainEvent`] by signature.
///
/// Lets handlers be registered against a concrete payload type instead of
/// matching on the union themselves.
pub trait TypedEvent: Sized + 'static {
    /// Signature the payload type is bound to.
    const SIGNATURE: EventSignature;

    /// Borrow the payload when the event carries this type.
    fn extract(payload: &EventPayload) -> Option<&Self>;
}

macro_rules! typed_event {
    ($ty:ident) => {
        impl TypedEvent for $ty {
            const SIGNATURE: EventSignature = EventSignature::$ty;

            fn extract(payload: &EventPayload) -> Option<&Self> {
                match payload {
                    EventPayload::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for EventPayload {
            fn from(inner: $ty) -> Self {
                EventPayload::$ty(inner)
            }
        }
    };
}

typed_event!(RoomCreated);
typed_event!(PlayerEntered);
typed_event!(PlayerMoved);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_name_and_canonical() {
        assert_eq!(
            "PlayerMoved".parse::<EventSignature>().unwrap(),
            EventSignature::PlayerMoved
        );
        assert_eq!(
            "PlayerEntered(address,uint256,string)"
                .parse::<EventSignature>()
                .unwrap(),
            EventSignature::PlayerEntered
        );
    }

    #[test]
    fn test_unknown_signature_rejected() {
        let err = "Foo".parse::<EventSignature>().unwrap_err();
        assert_eq!(err, UnknownSignature("Foo".to_string()));
    }

    #[test]
    fn test_topics_are_distinct_and_reversible() {
        for sig in EventSignature::ALL {
            assert_eq!(EventSignature::from_topic(&sig.topic()), Some(sig));
        }
        assert_ne!(
            EventSignature::RoomCreated.topic(),
            EventSignature::PlayerMoved.topic()
        );
        assert_eq!(EventSignature::from_topic(&Hash::ZERO), None);
    }

    #[test]
    fn test_topic_is_keccak_of_canonical() {
        assert_eq!(
            EventSignature::PlayerMoved.topic(),
            keccak256(b"PlayerMoved(address,uint256,uint256,uint256)")
        );
    }

    #[test]
    fn test_cached_topics_follow_declaration_order() {
        for (idx, sig) in EventSignature::ALL.into_iter().enumerate() {
            assert_eq!(sig as usize, idx);
            assert_eq!(sig.topic(), keccak256(sig.canonical().as_bytes()));
        }
        assert_eq!(EventSignature::from_topic(&Hash::ZERO), None);
    }

    #[test]
    fn test_typed_extract() {
        let payload = EventPayload::from(PlayerMoved {
            player: Address::new([1u8; 20]),
            room_id: U256::from(3u64),
            x: U256::from(10_012u64),
            y: U256::from(9_996u64),
        });
        assert!(PlayerMoved::extract(&payload).is_some());
        assert!(PlayerEntered::extract(&payload).is_none());
        assert_eq!(payload.room_id(), U256::from(3u64));
        assert_eq!(payload.signature(), EventSignature::PlayerMoved);
    }
}
