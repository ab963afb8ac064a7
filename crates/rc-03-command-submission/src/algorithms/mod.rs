//! # Algorithms Module

pub mod extract;

pub use extract::extract_event;
