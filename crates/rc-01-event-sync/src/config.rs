//! # Poller Configuration

use serde::{Deserialize, Serialize};
use shared_types::BlockNumber;
use std::time::Duration;

use crate::domain::{invariant_window_size, SyncError, DEFAULT_POLL_INTERVAL_MS, MAX_WINDOW_SIZE};

/// Event poller configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Pause between cycles once caught up, in milliseconds.
    pub interval_ms: u64,

    /// Blocks per log query. Bounded by `MAX_WINDOW_SIZE`.
    pub window_size: u64,

    /// Resume point: the first query starts at `from_block + 1`.
    /// When `None`, history is skipped and polling starts at the current head.
    pub from_block: Option<BlockNumber>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            window_size: MAX_WINDOW_SIZE,
            from_block: None,
        }
    }
}

impl PollerConfig {
    /// Create a config for testing (fast interval).
    pub fn for_testing() -> Self {
        Self {
            interval_ms: 10,
            ..Self::default()
        }
    }

    /// Same config, resuming after `block`.
    #[must_use]
    pub fn resuming_after(mut self, block: BlockNumber) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject values the poller cannot run with.
    pub fn validate(&self) -> Result<(), SyncError> {
        invariant_window_size(self.window_size)?;
        if self.interval_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.interval_ms, 1_000);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.from_block, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let too_wide = PollerConfig {
            window_size: 21,
            ..PollerConfig::default()
        };
        assert!(too_wide.validate().is_err());

        let zero_window = PollerConfig {
            window_size: 0,
            ..PollerConfig::default()
        };
        assert!(zero_window.validate().is_err());

        let zero_interval = PollerConfig {
            interval_ms: 0,
            ..PollerConfig::default()
        };
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn test_resuming_after() {
        let config = PollerConfig::for_testing().resuming_after(99);
        assert_eq!(config.from_block, Some(99));
        assert_eq!(config.interval(), Duration::from_millis(10));
    }
}
