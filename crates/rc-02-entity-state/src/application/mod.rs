//! # Application Layer
//!
//! The reconciliation engine and its dispatcher wiring.

pub mod engine;
pub mod handlers;

pub use engine::{EventEffect, ReconciliationEngine, StepSummary};
pub use handlers::{fetch_room_seed, register_handlers, RoomSeed};
