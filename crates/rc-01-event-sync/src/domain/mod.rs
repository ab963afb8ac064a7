//! # Domain Module
//!
//! Core domain types for Event Sync.

pub mod errors;
pub mod invariants;
pub mod watermark;

pub use errors::*;
pub use invariants::*;
pub use watermark::*;
