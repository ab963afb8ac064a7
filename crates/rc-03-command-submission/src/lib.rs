//! # RC-03 Command Submission
//!
//! Contract writes with receipt-linked outcomes.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Turn the local actor's intents (create a room, enter a room, move) into
//! transactions, wait for them to be mined, and report which contract event
//! each one produced.
//!
//! ## Outcomes
//!
//! | Receipt | Outcome |
//! |---------|---------|
//! | Submission rejected / no receipt | `Failed` |
//! | Reverted | `Failed(Reverted)` |
//! | Mined, expected event from the contract | `Confirmed` |
//! | Mined, no matching event | `Unconfirmed` (committed, warning) |
//!
//! The confirming event is not applied to local state here; the same event
//! reaches the entity store through the poller like any other.
//!
//! ## Module Structure
//!
//! ```text
//! rc-03-command-submission/
//! ├── domain/          # RoomCommand, PendingCommand, Receipt, CommandOutcome, errors
//! ├── algorithms/      # Receipt event extraction
//! ├── ports/           # CommandLedger trait, MockCommandLedger
//! ├── application/     # CommandSubmitter
//! └── config.rs        # SubmitterConfig
//! ```

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use algorithms::extract_event;
pub use application::CommandSubmitter;
pub use config::SubmitterConfig;
pub use domain::{
    CommandError, CommandOutcome, PendingCommand, PendingHandle, Receipt, RoomCommand,
    TransactionRequest,
};
pub use ports::{CommandLedger, MockCommandLedger, MockReceipt};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
