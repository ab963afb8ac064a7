//! # Submitter Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::CommandError;

/// Command submitter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterConfig {
    /// Give up waiting for a receipt after this long, in milliseconds.
    pub receipt_timeout_ms: u64,
    /// Delay between receipt lookups, in milliseconds.
    pub receipt_poll_interval_ms: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_ms: 60_000,
            receipt_poll_interval_ms: 500,
        }
    }
}

impl SubmitterConfig {
    /// Short timings for tests.
    pub fn for_testing() -> Self {
        Self {
            receipt_timeout_ms: 1_000,
            receipt_poll_interval_ms: 10,
        }
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.receipt_timeout_ms == 0 {
            return Err(CommandError::InvalidConfig(
                "receipt timeout must be positive".to_string(),
            ));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(CommandError::InvalidConfig(
                "receipt poll interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(SubmitterConfig::default().validate().is_ok());
        assert!(SubmitterConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = SubmitterConfig {
            receipt_poll_interval_ms: 0,
            ..SubmitterConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
