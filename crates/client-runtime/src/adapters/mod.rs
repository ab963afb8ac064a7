//! # Adapters
//!
//! Ledger gateway implementations. Each one serves all three outbound ports:
//! `LogSource`, `RoomDirectory` and `CommandLedger`.

pub mod in_memory;
pub mod json_rpc;

pub use in_memory::{spawn_wanderer, InMemoryLedger};
pub use json_rpc::JsonRpcLedger;
