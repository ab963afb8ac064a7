//! # Ports Module
//!
//! Hexagonal architecture ports. The poller only has outbound dependencies.

pub mod outbound;

pub use outbound::*;
