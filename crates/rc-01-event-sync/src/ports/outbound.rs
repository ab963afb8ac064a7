//! # Outbound Ports
//!
//! What the poller needs from the outside: a source of logs and a consumer
//! for the decoded events.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::DomainEvent;
use shared_types::{BlockNumber, LedgerError, LogQuery, LogRecord};
use std::sync::Arc;

use crate::domain::{SinkClosed, MAX_WINDOW_SIZE};

/// Read side of the ledger gateway - outbound port.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Current chain head.
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError>;

    /// Logs in `[query.from_block, query.to_block]` emitted by `query.address`
    /// with `topics[0] == query.topic`, ordered by `(block, log_index)`.
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LedgerError>;
}

#[async_trait]
impl<T: LogSource + ?Sized> LogSource for Arc<T> {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        (**self).latest_block().await
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LedgerError> {
        (**self).get_logs(query).await
    }
}

/// Consumer of decoded events - outbound port.
///
/// `forward` is awaited for each event in order; the poller does not move its
/// watermark past a window until every event of that window was accepted.
#[async_trait]
pub trait EventSink: Send {
    /// Accept one event.
    async fn forward(&mut self, event: DomainEvent) -> Result<(), SinkClosed>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

#[derive(Default)]
struct MockLedgerState {
    latest: BlockNumber,
    logs: Vec<LogRecord>,
    queries: Vec<LogQuery>,
    fail_queries: usize,
    fail_head: bool,
}

/// Mock log source for testing.
///
/// Enforces the same `MAX_WINDOW_SIZE` range cap a real ledger does and
/// records every query it serves.
#[derive(Clone, Default)]
pub struct MockLogSource {
    state: Arc<Mutex<MockLedgerState>>,
}

impl MockLogSource {
    /// Create a mock with the given chain head.
    pub fn new(latest: BlockNumber) -> Self {
        let mock = Self::default();
        mock.set_latest(latest);
        mock
    }

    /// Set the chain head.
    pub fn set_latest(&self, latest: BlockNumber) {
        self.state.lock().latest = latest;
    }

    /// Add a log. Logs are served in `(block, log_index)` order regardless of insertion order.
    pub fn push_log(&self, log: LogRecord) {
        self.state.lock().logs.push(log);
    }

    /// Fail the next `n` `get_logs` calls with a transport error.
    pub fn fail_next_queries(&self, n: usize) {
        self.state.lock().fail_queries = n;
    }

    /// Make `latest_block` fail until reset.
    pub fn set_head_failing(&self, failing: bool) {
        self.state.lock().fail_head = failing;
    }

    /// Every query served so far, including failed ones.
    pub fn queries(&self) -> Vec<LogQuery> {
        self.state.lock().queries.clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        let state = self.state.lock();
        if state.fail_head {
            return Err(LedgerError::Transport("Mock failure".to_string()));
        }
        Ok(state.latest)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, LedgerError> {
        let mut state = self.state.lock();
        state.queries.push(query.clone());

        if query.span() > MAX_WINDOW_SIZE {
            return Err(LedgerError::RangeTooLarge {
                span: query.span(),
                limit: MAX_WINDOW_SIZE,
            });
        }
        if state.fail_queries > 0 {
            state.fail_queries -= 1;
            return Err(LedgerError::Transport("Mock failure".to_string()));
        }

        let mut logs: Vec<LogRecord> = state
            .logs
            .iter()
            .filter(|log| query.matches(log))
            .cloned()
            .collect();
        logs.sort_by_key(LogRecord::position);
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, Hash};

    fn query(from: u64, to: u64) -> LogQuery {
        LogQuery {
            from_block: from,
            to_block: to,
            address: Address::new([1u8; 20]),
            topic: Hash::new([2u8; 32]),
        }
    }

    #[tokio::test]
    async fn test_mock_enforces_range_cap() {
        let mock = MockLogSource::new(100);
        assert!(mock.get_logs(&query(1, 20)).await.is_ok());
        assert!(matches!(
            mock.get_logs(&query(1, 21)).await,
            Err(LedgerError::RangeTooLarge { span: 21, limit: 20 })
        ));
        assert_eq!(mock.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_countdown() {
        let mock = MockLogSource::new(10);
        mock.fail_next_queries(1);
        assert!(mock.get_logs(&query(1, 10)).await.is_err());
        assert!(mock.get_logs(&query(1, 10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_head_failure() {
        let mock = MockLogSource::new(10);
        mock.set_head_failing(true);
        assert!(mock.latest_block().await.is_err());
        mock.set_head_failing(false);
        assert_eq!(mock.latest_block().await.unwrap(), 10);
    }
}
