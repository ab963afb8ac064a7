//! # Event Decoder
//!
//! Pure mapping from a raw log and the signature it was queried for to a
//! typed [`DomainEvent`].
//!
//! All three recognized events index `(address, uint256)` as `topics[1..=2]`;
//! only the non-indexed tail differs.

use shared_bus::{DomainEvent, EventPayload, EventSignature, PlayerEntered, PlayerMoved, RoomCreated};
use shared_types::abi::{self, AbiType, Token};
use shared_types::{Address, LogRecord, RoomId};

use crate::domain::DecodeError;

const INDEXED_TOPICS: usize = 3;

/// Decode `log` as an instance of `signature`.
pub fn decode_log(signature: EventSignature, log: &LogRecord) -> Result<DomainEvent, DecodeError> {
    let found = log.signature_topic().copied();
    if found != Some(signature.topic()) {
        return Err(DecodeError::SignatureMismatch {
            expected: signature,
            found,
        });
    }
    if log.topics.len() != INDEXED_TOPICS {
        return Err(DecodeError::TopicCount {
            expected: INDEXED_TOPICS,
            got: log.topics.len(),
        });
    }

    let actor = topic_address(log, 1)?;
    let room_id: RoomId = log.topics[2].to_u256();

    let payload = match signature {
        EventSignature::RoomCreated => EventPayload::RoomCreated(RoomCreated {
            creator: actor,
            room_id,
        }),
        EventSignature::PlayerEntered => {
            let name = abi::decode(&[AbiType::String], &log.data)?
                .into_iter()
                .next()
                .and_then(Token::into_string)
                .unwrap_or_default();
            EventPayload::PlayerEntered(PlayerEntered {
                player: actor,
                room_id,
                name,
            })
        }
        EventSignature::PlayerMoved => EventPayload::PlayerMoved(PlayerMoved {
            player: actor,
            room_id,
            x: abi::decode_uint(&log.data, 0)?,
            y: abi::decode_uint(&log.data, 1)?,
        }),
    };

    Ok(DomainEvent::new(log.position(), payload).with_transaction(log.transaction_hash))
}

/// Decode a log whose signature is inferred from `topics[0]`.
///
/// Returns `None` for topics outside the recognized set.
pub fn decode_any(log: &LogRecord) -> Option<Result<DomainEvent, DecodeError>> {
    let signature = log.signature_topic().and_then(EventSignature::from_topic)?;
    Some(decode_log(signature, log))
}

fn topic_address(log: &LogRecord, index: usize) -> Result<Address, DecodeError> {
    Address::from_word(log.topics[index].as_bytes()).ok_or(DecodeError::InvalidAddressTopic(index))
}

/// Build the raw log an event would be emitted as. The inverse of [`decode_log`].
///
/// Used by simulated ledgers and tests that need realistic logs.
#[must_use]
pub fn encode_log(contract: Address, event: &DomainEvent) -> LogRecord {
    let (actor, room_id, data) = match &event.payload {
        EventPayload::RoomCreated(e) => (e.creator, e.room_id, Vec::new()),
        EventPayload::PlayerEntered(e) => (
            e.player,
            e.room_id,
            abi::encode(&[Token::String(e.name.clone())]),
        ),
        EventPayload::PlayerMoved(e) => (
            e.player,
            e.room_id,
            abi::encode(&[Token::Uint(e.x), Token::Uint(e.y)]),
        ),
    };
    LogRecord {
        block_number: event.position.block_number,
        log_index: event.position.log_index,
        address: contract,
        topics: vec![
            event.signature().topic(),
            shared_types::Hash::new(actor.to_word()),
            shared_types::Hash::from_u256(room_id),
        ],
        data,
        transaction_hash: event.transaction_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{EventPosition, Hash, U256};

    fn contract() -> Address {
        Address::new([0xcc; 20])
    }

    fn moved_event() -> DomainEvent {
        DomainEvent::new(
            EventPosition::new(100, 1),
            EventPayload::PlayerMoved(PlayerMoved {
                player: Address::new([0xaa; 20]),
                room_id: U256::from(7u64),
                x: U256::from(10_012u64),
                y: U256::from(9_996u64),
            }),
        )
    }

    #[test]
    fn test_decode_player_moved() {
        let log = encode_log(contract(), &moved_event());
        let event = decode_log(EventSignature::PlayerMoved, &log).unwrap();
        assert_eq!(event, moved_event());
        assert_eq!(event.position, EventPosition::new(100, 1));
    }

    #[test]
    fn test_decode_player_entered_name() {
        let entered = DomainEvent::new(
            EventPosition::new(5, 0),
            EventPayload::PlayerEntered(PlayerEntered {
                player: Address::new([0xbb; 20]),
                room_id: U256::one(),
                name: "alice".to_string(),
            }),
        );
        let log = encode_log(contract(), &entered);
        assert_eq!(decode_log(EventSignature::PlayerEntered, &log).unwrap(), entered);
    }

    #[test]
    fn test_decode_room_created_has_no_data() {
        let created = DomainEvent::new(
            EventPosition::new(3, 2),
            EventPayload::RoomCreated(RoomCreated {
                creator: Address::new([0x01; 20]),
                room_id: U256::from(42u64),
            }),
        );
        let log = encode_log(contract(), &created);
        assert!(log.data.is_empty());
        assert_eq!(decode_log(EventSignature::RoomCreated, &log).unwrap(), created);
    }

    #[test]
    fn test_signature_mismatch() {
        let log = encode_log(contract(), &moved_event());
        assert!(matches!(
            decode_log(EventSignature::PlayerEntered, &log),
            Err(DecodeError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_data_fails() {
        let mut log = encode_log(contract(), &moved_event());
        log.data.truncate(40);
        assert!(matches!(
            decode_log(EventSignature::PlayerMoved, &log),
            Err(DecodeError::Data(_))
        ));
    }

    #[test]
    fn test_missing_topic_fails() {
        let mut log = encode_log(contract(), &moved_event());
        log.topics.pop();
        assert!(matches!(
            decode_log(EventSignature::PlayerMoved, &log),
            Err(DecodeError::TopicCount { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_dirty_address_topic_fails() {
        let mut log = encode_log(contract(), &moved_event());
        log.topics[1] = Hash::new([0xff; 32]);
        assert!(matches!(
            decode_log(EventSignature::PlayerMoved, &log),
            Err(DecodeError::InvalidAddressTopic(1))
        ));
    }

    #[test]
    fn test_decode_any_infers_signature() {
        let log = encode_log(contract(), &moved_event());
        let event = decode_any(&log).unwrap().unwrap();
        assert_eq!(event.signature(), EventSignature::PlayerMoved);

        let mut unknown = log;
        unknown.topics[0] = Hash::ZERO;
        assert!(decode_any(&unknown).is_none());
    }
}
