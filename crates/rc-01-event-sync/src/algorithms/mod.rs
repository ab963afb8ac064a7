//! # Algorithms Module
//!
//! Log decoding and window planning.

pub mod decoder;
pub mod window;

pub use decoder::{decode_any, decode_log, encode_log};
pub use window::{next_window, windows, Windows};
