//! # Algorithms Module
//!
//! Motion stepping.

pub mod motion;

pub use motion::{facing_for, step, StepOutcome};
