//! # Domain Errors

use shared_types::{CoordinateError, Hash, LedgerError};
use thiserror::Error;

/// Why a command did not produce a confirmed outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Arguments could not be encoded; nothing was submitted.
    #[error("Invalid coordinates: {0}")]
    Coordinate(#[from] CoordinateError),

    /// The ledger did not accept the transaction.
    #[error("Submission failed: {0}")]
    Submission(LedgerError),

    /// The transaction was accepted but no receipt was obtained.
    #[error("Receipt unavailable for {tx_hash}: {source}")]
    Receipt { tx_hash: Hash, source: LedgerError },

    /// The transaction was mined and reverted.
    #[error("Transaction {0} reverted")]
    Reverted(Hash),

    /// Invalid submitter configuration.
    #[error("Invalid submitter configuration: {0}")]
    InvalidConfig(String),
}

impl CommandError {
    /// Metric label for the failure kind.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Coordinate(_) => "invalid_args",
            Self::Submission(_) => "submit_failed",
            Self::Receipt { .. } => "receipt_failed",
            Self::Reverted(_) => "reverted",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
