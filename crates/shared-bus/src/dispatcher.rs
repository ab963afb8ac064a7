//! # Dispatcher
//!
//! Per-signature subscription table. `publish` runs every handler registered
//! for the event's signature, in subscription order, before returning.
//!
//! Handlers receive a mutable context `C` supplied by the caller at publish
//! time, so state owned by the pipeline (entity store, reconciliation engine)
//! is mutated without shared ownership or locks.

use crate::events::{DomainEvent, EventSignature, TypedEvent, UnknownSignature};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Boxed handler stored in the table.
pub type Handler<C> = Box<dyn FnMut(&mut C, &DomainEvent) + Send>;

/// Opaque handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The requested event is not in the recognized set.
    #[error("Cannot subscribe: {0}")]
    UnknownSignature(#[from] UnknownSignature),
}

struct Registered<C> {
    id: SubscriptionId,
    handler: Handler<C>,
}

/// Typed event dispatcher over a caller-supplied context.
pub struct Dispatcher<C> {
    table: HashMap<EventSignature, Vec<Registered<C>>>,
    next_id: u64,
    events_published: u64,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            next_id: 0,
            events_published: 0,
        }
    }

    /// Subscribe by event name or canonical signature.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::UnknownSignature` if the name is not recognized.
    /// Nothing is registered in that case.
    pub fn subscribe<F>(&mut self, signature: &str, handler: F) -> Result<SubscriptionId, SubscriptionError>
    where
        F: FnMut(&mut C, &DomainEvent) + Send + 'static,
    {
        let sig: EventSignature = signature.parse()?;
        Ok(self.subscribe_to(sig, handler))
    }

    /// Subscribe to a known signature.
    pub fn subscribe_to<F>(&mut self, signature: EventSignature, handler: F) -> SubscriptionId
    where
        F: FnMut(&mut C, &DomainEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.table.entry(signature).or_default().push(Registered {
            id,
            handler: Box::new(handler),
        });
        debug!(signature = %signature, id = id.0, "Handler subscribed");
        id
    }

    /// Subscribe with a handler that receives the concrete payload type.
    pub fn on<E, F>(&mut self, mut handler: F) -> SubscriptionId
    where
        E: TypedEvent,
        F: FnMut(&mut C, &E, &DomainEvent) + Send + 'static,
    {
        self.subscribe_to(E::SIGNATURE, move |ctx, event| {
            if let Some(payload) = E::extract(&event.payload) {
                handler(ctx, payload, event);
            }
        })
    }

    /// Remove a handler. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.table.values_mut() {
            if let Some(idx) = handlers.iter().position(|r| r.id == id) {
                handlers.remove(idx);
                return true;
            }
        }
        false
    }

    /// Deliver one event to every handler for its signature.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&mut self, ctx: &mut C, event: &DomainEvent) -> usize {
        self.events_published += 1;
        let Some(handlers) = self.table.get_mut(&event.signature()) else {
            trace!(signature = %event.signature(), "No handlers for event");
            return 0;
        };
        for registered in handlers.iter_mut() {
            (registered.handler)(ctx, event);
        }
        handlers.len()
    }

    /// Number of handlers registered for a signature.
    #[must_use]
    pub fn handler_count(&self, signature: EventSignature) -> usize {
        self.table.get(&signature).map_or(0, Vec::len)
    }

    /// Signatures with at least one handler, in declaration order.
    #[must_use]
    pub fn subscribed_signatures(&self) -> Vec<EventSignature> {
        EventSignature::ALL
            .into_iter()
            .filter(|sig| self.handler_count(*sig) > 0)
            .collect()
    }

    /// Total number of `publish` calls.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published
    }
}
