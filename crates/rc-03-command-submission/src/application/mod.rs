//! # Application Layer

pub mod submitter;

pub use submitter::CommandSubmitter;
