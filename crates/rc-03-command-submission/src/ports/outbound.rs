//! # Outbound Ports
//!
//! Write side of the ledger gateway.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{keccak256, BlockNumber, LedgerError, LogRecord};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::domain::{PendingHandle, Receipt, TransactionRequest};

/// Transaction submission and receipt lookup - outbound port.
#[async_trait]
pub trait CommandLedger: Send + Sync {
    /// Send a transaction from the gateway's account.
    async fn submit(&self, tx: &TransactionRequest) -> Result<PendingHandle, LedgerError>;

    /// Receipt for a submitted transaction, `None` while it is not yet mined.
    async fn get_receipt(&self, handle: &PendingHandle) -> Result<Option<Receipt>, LedgerError>;
}

#[async_trait]
impl<T: CommandLedger + ?Sized> CommandLedger for Arc<T> {
    async fn submit(&self, tx: &TransactionRequest) -> Result<PendingHandle, LedgerError> {
        (**self).submit(tx).await
    }

    async fn get_receipt(&self, handle: &PendingHandle) -> Result<Option<Receipt>, LedgerError> {
        (**self).get_receipt(handle).await
    }
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted result for one submission.
#[derive(Debug, Clone)]
pub enum MockReceipt {
    /// Mined successfully with these logs.
    Mined(Vec<LogRecord>),
    /// Mined and reverted.
    Reverted,
    /// Never mined.
    Pending,
}

#[derive(Default)]
struct MockCommandState {
    submitted: Vec<TransactionRequest>,
    script: VecDeque<MockReceipt>,
    receipts: HashMap<PendingHandle, (BlockNumber, MockReceipt)>,
    fail_submit: Option<LedgerError>,
    receipt_errors: VecDeque<LedgerError>,
    polls_before_mined: usize,
    polls: usize,
    next_block: BlockNumber,
}

/// Mock command ledger for testing.
///
/// Each submission consumes the next scripted [`MockReceipt`]; with nothing
/// scripted a transaction is mined with no logs.
#[derive(Clone, Default)]
pub struct MockCommandLedger {
    state: Arc<Mutex<MockCommandState>>,
}

impl MockCommandLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the receipt for the next unscripted submission.
    pub fn push_receipt(&self, receipt: MockReceipt) {
        self.state.lock().script.push_back(receipt);
    }

    /// Reject every submission with `error` until cleared.
    pub fn set_submit_error(&self, error: Option<LedgerError>) {
        self.state.lock().fail_submit = error;
    }

    /// Fail the next receipt lookup with `error`. Queued errors are served
    /// in order, one per lookup.
    pub fn push_receipt_error(&self, error: LedgerError) {
        self.state.lock().receipt_errors.push_back(error);
    }

    /// Report "not mined" this many times per transaction before the receipt.
    pub fn set_polls_before_mined(&self, polls: usize) {
        self.state.lock().polls_before_mined = polls;
    }

    /// Every accepted transaction, in order.
    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state.lock().submitted.clone()
    }

    /// Number of receipt lookups served.
    pub fn receipt_polls(&self) -> usize {
        self.state.lock().polls
    }
}

#[async_trait]
impl CommandLedger for MockCommandLedger {
    async fn submit(&self, tx: &TransactionRequest) -> Result<PendingHandle, LedgerError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_submit.clone() {
            return Err(err);
        }
        let nonce = state.submitted.len() as u64;
        state.submitted.push(tx.clone());
        state.next_block += 1;
        let block = state.next_block;

        let handle = PendingHandle {
            tx_hash: keccak256(&nonce.to_be_bytes()),
        };
        let scripted = state
            .script
            .pop_front()
            .unwrap_or(MockReceipt::Mined(Vec::new()));
        state.receipts.insert(handle, (block, scripted));
        Ok(handle)
    }

    async fn get_receipt(&self, handle: &PendingHandle) -> Result<Option<Receipt>, LedgerError> {
        let mut state = self.state.lock();
        state.polls += 1;
        if let Some(err) = state.receipt_errors.pop_front() {
            return Err(err);
        }
        if state.polls_before_mined > 0 {
            state.polls_before_mined -= 1;
            return Ok(None);
        }
        let Some((block, scripted)) = state.receipts.get(handle) else {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("unknown transaction {}", handle.tx_hash),
            });
        };
        let receipt = match scripted {
            MockReceipt::Pending => return Ok(None),
            MockReceipt::Reverted => Receipt {
                tx_hash: handle.tx_hash,
                block_number: *block,
                success: false,
                logs: Vec::new(),
            },
            MockReceipt::Mined(logs) => Receipt {
                tx_hash: handle.tx_hash,
                block_number: *block,
                success: true,
                logs: logs.clone(),
            },
        };
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Address;

    fn tx() -> TransactionRequest {
        TransactionRequest {
            to: Address::new([1u8; 20]),
            data: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn test_mock_mines_by_default() {
        let ledger = MockCommandLedger::new();
        let handle = ledger.submit(&tx()).await.unwrap();
        let receipt = ledger.get_receipt(&handle).await.unwrap().unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, 1);
        assert_eq!(ledger.submitted(), vec![tx()]);
    }

    #[tokio::test]
    async fn test_mock_scripted_revert_and_delay() {
        let ledger = MockCommandLedger::new();
        ledger.push_receipt(MockReceipt::Reverted);
        ledger.set_polls_before_mined(1);
        let handle = ledger.submit(&tx()).await.unwrap();
        assert!(ledger.get_receipt(&handle).await.unwrap().is_none());
        assert!(!ledger.get_receipt(&handle).await.unwrap().unwrap().success);
    }

    #[tokio::test]
    async fn test_mock_receipt_errors_served_once() {
        let ledger = MockCommandLedger::new();
        ledger.push_receipt_error(LedgerError::Transport("reset".to_string()));
        let handle = ledger.submit(&tx()).await.unwrap();
        assert!(ledger.get_receipt(&handle).await.is_err());
        assert!(ledger.get_receipt(&handle).await.unwrap().is_some());
        assert_eq!(ledger.receipt_polls(), 2);
    }

    #[tokio::test]
    async fn test_mock_submit_error() {
        let ledger = MockCommandLedger::new();
        ledger.set_submit_error(Some(LedgerError::Rejected("nonce too low".to_string())));
        assert!(ledger.submit(&tx()).await.is_err());
        assert!(ledger.submitted().is_empty());
    }
}
