//! # Wiring
//!
//! Connects pollers, dispatcher, engine and submitter into one session.

pub mod session;

pub use session::{ClientSession, LedgerGateway, SessionError, SessionUpdate};
