//! # Domain Module
//!
//! Entities, the entity store and errors.

pub mod entity;
pub mod errors;
pub mod store;

pub use entity::*;
pub use errors::*;
pub use store::*;
