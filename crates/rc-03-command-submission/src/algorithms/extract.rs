//! # Receipt Event Extraction
//!
//! Finds the event a command caused among the logs of its receipt. Logs from
//! other contracts are skipped; the first log that decodes as the expected
//! signature wins.

use rc_01_event_sync::decode_log;
use shared_bus::{DomainEvent, EventSignature};
use shared_types::{Address, LogRecord};
use tracing::trace;

/// Extract the first `expected` event emitted by `contract` in `logs`.
pub fn extract_event(
    contract: Address,
    expected: EventSignature,
    logs: &[LogRecord],
) -> Option<DomainEvent> {
    logs.iter()
        .filter(|log| log.address == contract)
        .find_map(|log| match decode_log(expected, log) {
            Ok(event) => Some(event),
            Err(e) => {
                trace!(position = %log.position(), error = %e, "Receipt log skipped");
                None
            }
        })
}
