//! # Application Module
//!
//! The polling loop orchestrating the window planner, decoder and ports.

pub mod poller;

pub use poller::{EventPoller, PollerHandle};
