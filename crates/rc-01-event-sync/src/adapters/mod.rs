//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the `EventSink` outbound port for common consumers.

mod sinks;
