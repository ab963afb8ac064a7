//! # Container
//!
//! Configuration for the client and its subsystems.

pub mod config;

pub use config::{CliArgs, ClientConfig, ConfigError, SIMULATED_ACCOUNT, SIMULATED_CONTRACT};
