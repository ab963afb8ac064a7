//! # Handlers
//!
//! Console input parsing.

pub mod cli;

pub use cli::{ClientCommand, CommandParseError, HELP};
