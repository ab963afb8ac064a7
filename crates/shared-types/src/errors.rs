//! # Error Types
//!
//! Defines error types shared across subsystems.

use thiserror::Error;

use crate::entities::Hash;

/// Errors from parsing fixed-width hex strings (addresses, hashes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHexError {
    /// Wrong number of hex digits.
    #[error("Invalid length: expected {expected} hex digits, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// Non-hex characters.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Errors reported by the ledger gateway.
///
/// Everything here is transient from the caller's point of view except
/// `Reverted`, which is a committed-but-failed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The request never reached the ledger or the connection dropped.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ledger answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The ledger did not answer in time.
    #[error("Timed out after {millis}ms waiting for {operation}")]
    Timeout { operation: String, millis: u64 },

    /// The ledger answered with something that could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The requested block range exceeds what the ledger serves in one query.
    #[error("Block range too large: {span} blocks (limit {limit})")]
    RangeTooLarge { span: u64, limit: u64 },

    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(Hash),

    /// The ledger rejected the submission outright.
    #[error("Submission rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// Whether the same request may succeed if simply repeated later.
    ///
    /// Covers dropped connections, timeouts and the JSON-RPC codes nodes use
    /// for rate limiting and overload (`-32005`, `-32603`, `429`).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Rpc { code, .. } => matches!(code, -32005 | -32603 | 429),
            Self::MalformedResponse(_)
            | Self::RangeTooLarge { .. }
            | Self::Reverted(_)
            | Self::Rejected(_) => false,
        }
    }
}

/// Errors from the Solidity ABI codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Read past the end of the encoded data.
    #[error("Out of bounds: need {needed} bytes at offset {offset}, have {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// An offset or length word does not fit in memory.
    #[error("Word too large for offset/length: {0}")]
    WordOverflow(String),

    /// Address word with non-zero padding.
    #[error("Invalid address word")]
    InvalidAddress,

    /// String payload is not UTF-8.
    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(String),
}

/// Errors from the coordinate offset codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// NaN or infinite input.
    #[error("Coordinate is not finite: {0}")]
    NotFinite(f64),

    /// `floor(v) + offset` would be negative.
    #[error("Coordinate {value} is below the encodable minimum {min}")]
    BelowMinimum { value: f64, min: i64 },

    /// Value does not fit the signed client range.
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::Rpc {
            code: -32005,
            message: "query returned more than 10000 results".to_string(),
        };
        assert!(err.to_string().contains("-32005"));

        let err = LedgerError::Timeout {
            operation: "eth_getLogs".to_string(),
            millis: 30_000,
        };
        assert!(err.to_string().contains("eth_getLogs"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::Transport("429 rate limited".to_string()).is_retryable());
        assert!(LedgerError::Timeout {
            operation: "eth_getTransactionReceipt".to_string(),
            millis: 10_000,
        }
        .is_retryable());
        assert!(LedgerError::Rpc {
            code: -32005,
            message: "limit exceeded".to_string(),
        }
        .is_retryable());
        assert!(!LedgerError::Rpc {
            code: -32602,
            message: "invalid params".to_string(),
        }
        .is_retryable());
        assert!(!LedgerError::MalformedResponse("not json".to_string()).is_retryable());
        assert!(!LedgerError::Rejected("nonce too low".to_string()).is_retryable());
    }

    #[test]
    fn test_range_too_large_display() {
        let err = LedgerError::RangeTooLarge { span: 21, limit: 20 };
        assert!(err.to_string().contains("21 blocks"));
    }

    #[test]
    fn test_coordinate_error_display() {
        let err = CoordinateError::BelowMinimum {
            value: -10_001.0,
            min: -10_000,
        };
        assert!(err.to_string().contains("-10000"));
    }
}
