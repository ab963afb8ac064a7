//! # Reconciliation Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ReconcileError;

/// Walking speed used by the original client, in world units per second.
pub const DEFAULT_SPEED: f64 = 100.0;

/// What to do when the ledger's confirmed position for the local actor
/// disagrees with the locally predicted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelfCorrectionPolicy {
    /// Never act on confirmed self positions.
    Ignore,
    /// Walk back to the confirmed position once the actor has been idle and
    /// out of tolerance for the configured timeout.
    #[default]
    RetargetAfterTimeout,
}

/// Reconciliation engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Movement speed, units per second.
    pub speed: f64,

    /// Frame step interval used by the runtime, in milliseconds.
    pub frame_interval_ms: u64,

    /// Self divergence handling.
    pub self_correction: SelfCorrectionPolicy,

    /// Distance beyond which predicted and confirmed self positions disagree.
    /// Must exceed the flooring error of the coordinate codec (sqrt 2).
    pub self_tolerance: f64,

    /// How long the disagreement must persist while idle, in milliseconds.
    pub self_correction_timeout_ms: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            frame_interval_ms: 50,
            self_correction: SelfCorrectionPolicy::default(),
            self_tolerance: 2.0,
            self_correction_timeout_ms: 5_000,
        }
    }
}

impl ReconcileConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Timeout in seconds of stepped time.
    pub fn self_correction_timeout_secs(&self) -> f64 {
        self.self_correction_timeout_ms as f64 / 1_000.0
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ReconcileError::InvalidConfig(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(ReconcileError::InvalidConfig(
                "frame interval must be positive".to_string(),
            ));
        }
        if !(self.self_tolerance.is_finite() && self.self_tolerance >= 0.0) {
            return Err(ReconcileError::InvalidConfig(format!(
                "self tolerance must be non-negative, got {}",
                self.self_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcileConfig::default();
        assert_eq!(config.speed, 100.0);
        assert_eq!(config.self_correction, SelfCorrectionPolicy::RetargetAfterTimeout);
        assert_eq!(config.self_correction_timeout_secs(), 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_speed() {
        let config = ReconcileConfig {
            speed: 0.0,
            ..ReconcileConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ReconcileConfig {
            speed: f64::INFINITY,
            ..ReconcileConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_frame_interval() {
        let config = ReconcileConfig {
            frame_interval_ms: 0,
            ..ReconcileConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
