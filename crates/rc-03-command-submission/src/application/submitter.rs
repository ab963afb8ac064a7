//! # Command Submitter
//!
//! Submit, await the receipt, then find the event the command caused.
//!
//! ```text
//! RoomCommand ──calldata──▶ CommandLedger::submit ──▶ PendingHandle
//!                                                        │ poll get_receipt
//!                                                        ▼
//!      CommandOutcome ◀── extract_event(contract, expected) ◀── Receipt
//! ```
//!
//! Every path ends in a [`CommandOutcome`]; nothing here returns `Err`.

use rc_telemetry::{log_command_event, COMMANDS, COMMAND_LATENCY};
use shared_bus::{DomainEvent, PlayerEntered, PlayerMoved, RoomCreated, TypedEvent};
use shared_types::{encode_point, Address, LedgerError, RoomId};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::algorithms::extract_event;
use crate::config::SubmitterConfig;
use crate::domain::{
    CommandError, CommandOutcome, PendingCommand, Receipt, RoomCommand, TransactionRequest,
};
use crate::ports::CommandLedger;

const SUBSYSTEM: &str = "command-submission";

/// Submits room commands and links each to the event in its receipt.
///
/// Cheap to clone; clones share the ledger so submissions can run on
/// spawned tasks.
pub struct CommandSubmitter<L: CommandLedger + ?Sized> {
    ledger: Arc<L>,
    contract: Address,
    config: SubmitterConfig,
}

impl<L: CommandLedger + ?Sized> Clone for CommandSubmitter<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            contract: self.contract,
            config: self.config.clone(),
        }
    }
}

impl<L: CommandLedger + ?Sized> CommandSubmitter<L> {
    pub fn new(ledger: Arc<L>, contract: Address, config: SubmitterConfig) -> Result<Self, CommandError> {
        config.validate()?;
        Ok(Self {
            ledger,
            contract,
            config,
        })
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// `createRoom(name)`; confirms with the new room's id.
    pub async fn create_room(&self, name: &str) -> CommandOutcome<RoomId> {
        self.submit_typed::<RoomCreated>(RoomCommand::CreateRoom {
            name: name.to_string(),
        })
        .await
        .map(|created| created.room_id)
    }

    /// `enterRoom(room_id, name)`.
    pub async fn enter_room(&self, room_id: RoomId, name: &str) -> CommandOutcome<PlayerEntered> {
        self.submit_typed(RoomCommand::EnterRoom {
            room_id,
            name: name.to_string(),
        })
        .await
    }

    /// `move(x, y)` with client coordinates; encodes `floor(v) + OFFSET`.
    ///
    /// Out-of-domain coordinates fail before anything is submitted.
    pub async fn move_to(&self, x: f64, y: f64) -> CommandOutcome<PlayerMoved> {
        let (x, y) = match encode_point(x, y) {
            Ok(encoded) => encoded,
            Err(e) => {
                let outcome = CommandOutcome::Failed(CommandError::Coordinate(e));
                COMMANDS.with_label_values(&["move", outcome.label()]).inc();
                return outcome;
            }
        };
        self.submit_typed(RoomCommand::Move { x, y }).await
    }

    async fn submit_typed<E: TypedEvent + Clone>(&self, command: RoomCommand) -> CommandOutcome<E> {
        match self.submit(command).await {
            CommandOutcome::Confirmed { event, .. } => match E::extract(&event.payload) {
                Some(value) => CommandOutcome::Confirmed {
                    value: value.clone(),
                    event,
                },
                None => CommandOutcome::Unconfirmed {
                    tx_hash: event.transaction_hash.unwrap_or_default(),
                    warning: format!("unexpected {} event", event.signature()),
                },
            },
            CommandOutcome::Unconfirmed { tx_hash, warning } => {
                CommandOutcome::Unconfirmed { tx_hash, warning }
            }
            CommandOutcome::Failed(e) => CommandOutcome::Failed(e),
        }
    }

    /// Submit any command and return the raw confirming event.
    pub async fn submit(&self, command: RoomCommand) -> CommandOutcome<DomainEvent> {
        let name = command.name();
        let correlation_id = Uuid::new_v4();
        log_command_event!(info, SUBSYSTEM, "Submitting command", name, correlation_id, call = %command);

        let tx = TransactionRequest {
            to: self.contract,
            data: command.calldata(),
        };
        let outcome = match self.ledger.submit(&tx).await {
            Err(e) => CommandOutcome::Failed(CommandError::Submission(e)),
            Ok(handle) => {
                let pending = PendingCommand::new(command.expected_signature(), handle, correlation_id);
                self.resolve(name, pending).await
            }
        };

        COMMANDS.with_label_values(&[name, outcome.label()]).inc();
        match &outcome {
            CommandOutcome::Confirmed { event, .. } => {
                log_command_event!(info, SUBSYSTEM, "Command confirmed", name, correlation_id, position = %event.position);
            }
            CommandOutcome::Unconfirmed { tx_hash, warning } => {
                log_command_event!(warn, SUBSYSTEM, "Command committed without a matching event", name, correlation_id, tx_hash = %tx_hash, warning = %warning);
            }
            CommandOutcome::Failed(e) => {
                log_command_event!(warn, SUBSYSTEM, "Command failed", name, correlation_id, reason = e.label(), error = %e);
            }
        }
        outcome
    }

    async fn resolve(&self, name: &'static str, pending: PendingCommand) -> CommandOutcome<DomainEvent> {
        let tx_hash = pending.handle.tx_hash;
        let receipt = match self.await_receipt(&pending).await {
            Ok(receipt) => receipt,
            Err(source) => return CommandOutcome::Failed(CommandError::Receipt { tx_hash, source }),
        };
        COMMAND_LATENCY
            .with_label_values(&[name])
            .observe(pending.submitted_at.elapsed().as_secs_f64());

        if !receipt.success {
            return CommandOutcome::Failed(CommandError::Reverted(tx_hash));
        }

        match extract_event(self.contract, pending.expected, &receipt.logs) {
            Some(event) => CommandOutcome::Confirmed {
                value: event.clone(),
                event,
            },
            None => CommandOutcome::Unconfirmed {
                tx_hash,
                warning: format!(
                    "no {} event from {} among {} receipt logs",
                    pending.expected,
                    self.contract,
                    receipt.logs.len()
                ),
            },
        }
    }

    /// Poll until the receipt appears or the deadline passes. Retryable
    /// ledger errors count as "not mined yet"; anything else ends the wait.
    async fn await_receipt(&self, pending: &PendingCommand) -> Result<Receipt, LedgerError> {
        let deadline = Instant::now() + self.config.receipt_timeout();
        loop {
            match self.ledger.get_receipt(&pending.handle).await {
                Ok(Some(receipt)) => {
                    debug!(
                        correlation_id = %pending.correlation_id,
                        block = receipt.block_number,
                        success = receipt.success,
                        "Receipt obtained"
                    );
                    return Ok(receipt);
                }
                Ok(None) => {}
                Err(e) if e.is_retryable() => {
                    debug!(correlation_id = %pending.correlation_id, error = %e, "Receipt lookup failed, retrying");
                }
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                warn!(correlation_id = %pending.correlation_id, tx_hash = %pending.handle.tx_hash, "Receipt timeout");
                return Err(LedgerError::Timeout {
                    operation: format!("receipt of {}", pending.handle.tx_hash),
                    millis: self.config.receipt_timeout_ms,
                });
            }
            sleep(self.config.receipt_poll_interval()).await;
        }
    }
}
