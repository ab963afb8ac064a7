//! # Domain Errors

use shared_types::CoordinateError;
use thiserror::Error;

/// Entity State error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// A local move was requested before the local actor has an entity.
    #[error("Local actor has no entity yet")]
    NoSelf,

    /// The requested target is not a finite point.
    #[error("Invalid target: ({x}, {y})")]
    InvalidTarget { x: f64, y: f64 },

    /// An on-chain coordinate could not be decoded.
    #[error("Coordinate error: {0}")]
    Coordinate(#[from] CoordinateError),

    /// Invalid reconciliation configuration.
    #[error("Invalid reconcile configuration: {0}")]
    InvalidConfig(String),
}
