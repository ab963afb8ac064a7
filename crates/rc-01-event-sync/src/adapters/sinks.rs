//! # Event Sinks
//!
//! Ready-made [`EventSink`] implementations: collect into a `Vec` or hand off
//! over a tokio channel.

use async_trait::async_trait;
use shared_bus::DomainEvent;
use tokio::sync::mpsc;

use crate::domain::SinkClosed;
use crate::ports::EventSink;

#[async_trait]
impl EventSink for Vec<DomainEvent> {
    async fn forward(&mut self, event: DomainEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

#[async_trait]
impl EventSink for mpsc::Sender<DomainEvent> {
    async fn forward(&mut self, event: DomainEvent) -> Result<(), SinkClosed> {
        self.send(event).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<DomainEvent> {
    async fn forward(&mut self, event: DomainEvent) -> Result<(), SinkClosed> {
        self.send(event).map_err(|_| SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventPayload, RoomCreated};
    use shared_types::{Address, EventPosition, U256};

    fn created(index: u64) -> DomainEvent {
        DomainEvent::new(
            EventPosition::new(1, index),
            EventPayload::RoomCreated(RoomCreated {
                creator: Address::ZERO,
                room_id: U256::from(index),
            }),
        )
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        assert!(tx.forward(created(0)).await.is_ok());
        drop(rx);
        assert_eq!(tx.forward(created(1)).await, Err(SinkClosed));
    }
}
