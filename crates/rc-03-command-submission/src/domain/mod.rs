//! # Domain Module
//!
//! Commands, receipts, outcomes and errors.

pub mod command;
pub mod errors;
pub mod outcome;
pub mod receipt;

pub use command::{PendingCommand, RoomCommand};
pub use errors::CommandError;
pub use outcome::CommandOutcome;
pub use receipt::{PendingHandle, Receipt, TransactionRequest};
