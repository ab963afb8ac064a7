//! # Domain Errors
//!
//! Error types for Event Sync.

use shared_bus::{EventSignature, UnknownSignature};
use shared_types::{AbiError, Hash, LedgerError};
use thiserror::Error;

/// A log could not be turned into a [`shared_bus::DomainEvent`].
///
/// Decode failures are per-log: the poller skips the log and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// `topics[0]` is not the topic of the expected signature.
    #[error("Signature mismatch: expected {expected}, found topic {found:?}")]
    SignatureMismatch {
        /// Signature the log was decoded against.
        expected: EventSignature,
        /// Topic actually present, if any.
        found: Option<Hash>,
    },

    /// Wrong number of topics for the signature.
    #[error("Expected {expected} topics, got {got}")]
    TopicCount {
        /// Topics the layout requires.
        expected: usize,
        /// Topics present on the log.
        got: usize,
    },

    /// An indexed address topic has non-zero padding.
    #[error("Topic {0} is not a valid address")]
    InvalidAddressTopic(usize),

    /// Non-indexed data failed ABI decoding.
    #[error("Malformed event data: {0}")]
    Data(#[from] AbiError),
}

/// The consumer of decoded events has gone away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Event sink closed")]
pub struct SinkClosed;

/// Event Sync error types.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The ledger query failed. The cycle is abandoned and retried later.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Polling was requested for an event outside the recognized set.
    #[error("Configuration error: {0}")]
    UnknownSignature(#[from] UnknownSignature),

    /// Invalid poller configuration.
    #[error("Invalid poller configuration: {0}")]
    InvalidConfig(String),

    /// Downstream consumer closed; the poller cannot make progress.
    #[error(transparent)]
    SinkClosed(#[from] SinkClosed),

    /// The background polling task panicked or was aborted.
    #[error("Polling task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    /// Whether the next cycle may succeed without intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_are_transient() {
        let err = SyncError::from(LedgerError::Transport("connection refused".to_string()));
        assert!(err.is_transient());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_configuration_errors_are_not_transient() {
        let err = SyncError::from(UnknownSignature("Foo".to_string()));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("Foo"));

        assert!(!SyncError::from(SinkClosed).is_transient());
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TopicCount {
            expected: 3,
            got: 1,
        };
        assert!(err.to_string().contains("3 topics"));
    }
}
