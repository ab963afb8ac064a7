//! # Transactions and Receipts

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber, Hash, LogRecord};

/// A contract call to submit. The sender is whatever account the ledger
/// gateway is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Vec<u8>,
}

/// Handle to an accepted, not yet mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingHandle {
    pub tx_hash: Hash,
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: Hash,
    pub block_number: BlockNumber,
    /// `false` when the transaction reverted.
    pub success: bool,
    /// Every log emitted by the transaction, from any contract.
    pub logs: Vec<LogRecord>,
}
