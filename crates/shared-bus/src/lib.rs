//! # Shared Bus - Typed Event Dispatch
//!
//! Connects the event poller to the state that consumes decoded events.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   DomainEvent    ┌──────────────┐   handler(ctx, e)   ┌──────────────┐
//! │ EventPoller  │ ───────────────→ │  Dispatcher  │ ──────────────────→ │ Reconciler / │
//! │  (rc-01)     │  ledger order    │              │  subscription order │ Entity store │
//! └──────────────┘                  └──────────────┘                     └──────────────┘
//! ```
//!
//! ## Rules
//!
//! - The signature set is closed: subscribing to anything else fails at
//!   registration time.
//! - Handlers for one event all run before the next event is published.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dispatcher;
pub mod events;

pub use dispatcher::{Dispatcher, Handler, SubscriptionError, SubscriptionId};
pub use events::{
    DomainEvent, EventPayload, EventSignature, PlayerEntered, PlayerMoved, RoomCreated,
    TypedEvent, UnknownSignature,
};
