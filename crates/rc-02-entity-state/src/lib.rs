//! # RC-02 Entity State
//!
//! Entity store, motion stepping, and reconciliation of locally predicted
//! movement with confirmed ledger events.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Keep one [`Entity`] per player in the current room. Movement is
//! optimistic: the local actor starts walking as soon as it asks to move,
//! and remote players walk toward each newly confirmed position instead of
//! jumping to it.
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | No teleport | Remote confirmations only set a target |
//! | Prediction first | Self confirmations are recorded, never applied directly |
//! | Idempotent | Events at or before the last confirmation are no-ops |
//! | Room scoped | Events for other rooms are ignored; entering a room drops the old one |
//! | Bounded drift | Idle self drifting past tolerance is retargeted after a timeout |
//!
//! ## Module Structure
//!
//! ```text
//! rc-02-entity-state/
//! ├── domain/          # Entity, EntityStateStore, errors
//! ├── algorithms/      # Motion step
//! ├── ports/           # RoomDirectory trait, MockRoomDirectory
//! ├── application/     # ReconciliationEngine, dispatcher wiring
//! └── config.rs        # ReconcileConfig
//! ```

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use algorithms::{facing_for, step, StepOutcome};
pub use application::{
    fetch_room_seed, register_handlers, EventEffect, ReconciliationEngine, RoomSeed, StepSummary,
};
pub use config::{ReconcileConfig, SelfCorrectionPolicy, DEFAULT_SPEED};
pub use domain::{
    ConfirmedPosition, Entity, EntityStateStore, Facing, MovementStatus, Point, ReconcileError,
};
pub use ports::{MockRoomDirectory, RoomDirectory, RoomOccupant, RoomSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
