//! # RC-01 Event Sync
//!
//! Bounded-window log polling with a monotonic watermark.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Discover contract events on a remote ledger and hand them downstream as
//! typed [`shared_bus::DomainEvent`]s, strictly in `(block, log_index)` order,
//! without ever querying more than [`MAX_WINDOW_SIZE`] blocks at once.
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | No gaps | Windows start at `watermark + 1` and are contiguous |
//! | No loss | Watermark moves only after a window's events are forwarded |
//! | Idempotent retry | Failed cycles leave the watermark; queries are pure reads |
//! | Bounded queries | Window size validated at construction, capped at 20 |
//! | Robust decode | One bad log is skipped, the rest of the window still flows |
//!
//! ## Module Structure
//!
//! ```text
//! rc-01-event-sync/
//! ├── domain/          # Watermark, BlockWindow, CycleReport, errors, invariants
//! ├── algorithms/      # Log decoder, window planner
//! ├── ports/           # LogSource + EventSink traits, MockLogSource
//! ├── adapters/        # Vec / channel sinks
//! ├── application/     # EventPoller loop
//! └── config.rs        # PollerConfig
//! ```

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use algorithms::{decode_any, decode_log, encode_log, next_window, windows};
pub use application::{EventPoller, PollerHandle};
pub use config::PollerConfig;
pub use domain::{
    BlockWindow, CycleReport, DecodeError, SinkClosed, SyncError, Watermark,
    DEFAULT_POLL_INTERVAL_MS, MAX_WINDOW_SIZE,
};
pub use ports::{EventSink, LogSource, MockLogSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
