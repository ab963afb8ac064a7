//! # Shared Types Crate
//!
//! Ledger primitives used by every Room-Chain subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, hashes and log records are
//!   defined once and shared by the poller, the reconciler and the submitter.
//! - **Canonical Addresses**: an [`Address`] is parsed into its 20-byte form
//!   at the boundary, so spellings that differ only in letter case compare
//!   equal everywhere downstream.
//! - **Offset Coordinates**: the contract stores unsigned coordinates; the
//!   [`coordinates`] module owns the only conversion in and out.

pub mod abi;
pub mod coordinates;
pub mod entities;
pub mod errors;

pub use abi::{keccak256, selector, AbiType, Token};
pub use coordinates::{
    decode_coordinate, decode_point, encode_coordinate, encode_point, COORDINATE_OFFSET,
};
pub use entities::*;
pub use errors::*;
