//! # Core Ledger Entities
//!
//! Defines the primitives exchanged with the ledger gateway.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`
//! - **Ordering**: `BlockNumber`, `EventPosition`
//! - **Logs**: `LogRecord`, `LogQuery`

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseHexError;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// Block height as reported by the ledger.
pub type BlockNumber = u64;

/// Room identifier assigned by the contract.
pub type RoomId = U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 20-byte Ethereum-style address.
///
/// Parsing accepts any letter case; the stored bytes are the canonical key
/// and `Display` always renders lower-case hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Extracts an address from a left-padded 32-byte word (topic or ABI slot).
    ///
    /// Returns `None` when the 12 padding bytes are not zero.
    #[must_use]
    pub fn from_word(word: &[u8; 32]) -> Option<Self> {
        if word[..12].iter().any(|b| *b != 0) {
            return None;
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Some(Self(bytes))
    }

    /// Left-pads the address into a 32-byte word.
    #[must_use]
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = parse_fixed_hex::<20>(s)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte hash (Keccak-256 topics, transaction hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interprets the hash as a big-endian unsigned integer (indexed uint topics).
    #[must_use]
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Encodes an unsigned integer as a topic word.
    #[must_use]
    pub fn from_u256(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Self(bytes)
    }
}

impl FromStr for Hash {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_fixed_hex::<32>(s)?))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[28..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

fn parse_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() != N * 2 {
        return Err(ParseHexError::InvalidLength {
            expected: N * 2,
            got: digits.len(),
        });
    }
    let mut bytes = [0u8; N];
    hex::decode_to_slice(digits, &mut bytes).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
    Ok(bytes)
}

macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_serde!(Address);
hex_serde!(Hash);

// =============================================================================
// CLUSTER B: ORDERING
// =============================================================================

/// Position of a log in the ledger.
///
/// Derived `Ord` compares `(block_number, log_index)` lexicographically,
/// which is the total order over logs emitted by one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EventPosition {
    /// Block that contains the log.
    pub block_number: BlockNumber,
    /// Index of the log within its block.
    pub log_index: u64,
}

impl EventPosition {
    /// Create a new event position.
    #[must_use]
    pub const fn new(block_number: BlockNumber, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block_number, self.log_index)
    }
}

// =============================================================================
// CLUSTER C: LOGS
// =============================================================================

/// A raw log emitted by a contract, as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Block that contains the log.
    pub block_number: BlockNumber,
    /// Index of the log within its block.
    pub log_index: u64,
    /// Contract that emitted the log.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature topic.
    pub topics: Vec<Hash>,
    /// ABI-encoded non-indexed arguments.
    pub data: Vec<u8>,
    /// Transaction that produced the log, when the ledger reports it.
    pub transaction_hash: Option<Hash>,
}

impl LogRecord {
    /// Ledger position of this log.
    #[must_use]
    pub fn position(&self) -> EventPosition {
        EventPosition::new(self.block_number, self.log_index)
    }

    /// Signature topic, if present.
    #[must_use]
    pub fn signature_topic(&self) -> Option<&Hash> {
        self.topics.first()
    }
}

/// A log query over an inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// First block (inclusive).
    pub from_block: BlockNumber,
    /// Last block (inclusive).
    pub to_block: BlockNumber,
    /// Contract whose logs are requested.
    pub address: Address,
    /// Signature topic the logs must carry in `topics[0]`.
    pub topic: Hash,
}

impl LogQuery {
    /// Number of blocks covered by the query.
    #[must_use]
    pub fn span(&self) -> u64 {
        self.to_block.saturating_sub(self.from_block) + 1
    }

    /// Whether a log satisfies this query's block range, address and topic.
    #[must_use]
    pub fn matches(&self, log: &LogRecord) -> bool {
        log.block_number >= self.from_block
            && log.block_number <= self.to_block
            && log.address == self.address
            && log.signature_topic() == Some(&self.topic)
    }
}
