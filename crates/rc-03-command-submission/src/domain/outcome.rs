//! # Command Outcomes

use shared_bus::DomainEvent;
use shared_types::Hash;

use super::errors::CommandError;

/// Typed result of a submitted command. Never an unwinding error.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome<T> {
    /// The receipt carried the expected event.
    Confirmed { value: T, event: DomainEvent },
    /// The transaction committed but no matching contract event was found.
    Unconfirmed { tx_hash: Hash, warning: String },
    /// Nothing was committed, or the transaction reverted.
    Failed(CommandError),
}

impl<T> CommandOutcome<T> {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Unconfirmed { .. } => "unconfirmed",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Confirmed { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn event(&self) -> Option<&DomainEvent> {
        match self {
            Self::Confirmed { event, .. } => Some(event),
            _ => None,
        }
    }

    /// Drop the typed value, keeping the confirming event.
    pub fn into_event(self) -> CommandOutcome<DomainEvent> {
        match self {
            Self::Confirmed { event, .. } => CommandOutcome::Confirmed {
                value: event.clone(),
                event,
            },
            Self::Unconfirmed { tx_hash, warning } => CommandOutcome::Unconfirmed { tx_hash, warning },
            Self::Failed(e) => CommandOutcome::Failed(e),
        }
    }

    /// Transform the confirmed value, keeping the other variants.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CommandOutcome<U> {
        match self {
            Self::Confirmed { value, event } => CommandOutcome::Confirmed {
                value: f(value),
                event,
            },
            Self::Unconfirmed { tx_hash, warning } => CommandOutcome::Unconfirmed { tx_hash, warning },
            Self::Failed(e) => CommandOutcome::Failed(e),
        }
    }
}
