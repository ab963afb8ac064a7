//! # Room-Chain Client Runtime Library
//!
//! This library exposes the internal modules of the client runtime for
//! testing. The main entry point is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **Event-Driven**: ledger events flow through one dispatcher into the
//!   reconciliation engine; nothing else mutates the entity store
//! - **Hexagonal Architecture**: subsystems depend on ports; the JSON-RPC and
//!   in-memory gateways implement them
//! - **Single Writer**: pollers, submissions and directory queries run as
//!   tasks and report back over channels to the session loop

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod wiring;

pub use adapters::{spawn_wanderer, InMemoryLedger, JsonRpcLedger};
pub use container::{CliArgs, ClientConfig, ConfigError};
pub use handlers::{ClientCommand, CommandParseError, HELP};
pub use wiring::{ClientSession, LedgerGateway, SessionError, SessionUpdate};
