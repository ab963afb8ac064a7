//! # Client Session
//!
//! The single control flow that owns the dispatcher, the reconciliation
//! engine and its entity store.
//!
//! ```text
//!  poller(RoomCreated) ─┐
//!  poller(PlayerEntered)├─ events ──▶ ┌──────────────────────────┐
//!  poller(PlayerMoved) ─┘             │ ClientSession (select!)  │
//!  spawned submissions ── updates ──▶ │  Dispatcher ─▶ Engine    │ ──▶ output
//!  spawned seed fetches ─ updates ──▶ │  frame tick ─▶ step(dt)  │
//!  console ───────────── commands ──▶ └──────────────────────────┘
//! ```
//!
//! Nothing outside the loop touches the engine, so handlers need no locks.
//! Receipt events from local commands go through the same dispatcher as
//! polled events; the engine drops whichever copy arrives second.

use rc_01_event_sync::{EventPoller, LogSource, PollerConfig, PollerHandle, SyncError};
use rc_02_entity_state::{
    fetch_room_seed, register_handlers, ReconcileError, ReconciliationEngine, RoomDirectory, RoomSeed,
};
use rc_03_command_submission::{
    CommandError, CommandLedger, CommandOutcome, CommandSubmitter, RoomCommand,
};
use rc_telemetry::encode_metrics;
use shared_bus::{Dispatcher, DomainEvent, EventPayload, EventSignature};
use shared_types::{Address, LedgerError, RoomId, U256};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::container::{ClientConfig, ConfigError};
use crate::handlers::{ClientCommand, HELP};

/// Everything a ledger gateway must serve for a session.
pub trait LedgerGateway: LogSource + RoomDirectory + CommandLedger + 'static {}

impl<T: LogSource + RoomDirectory + CommandLedger + 'static> LedgerGateway for T {}

/// Errors that stop a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Event sync: {0}")]
    Sync(#[from] SyncError),

    #[error("Entity state: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Command submission: {0}")]
    Command(#[from] CommandError),
}

/// Work finished off the session loop.
#[derive(Debug)]
pub enum SessionUpdate {
    Seed(RoomSeed),
    SeedFailed { room: RoomId, error: LedgerError },
    CommandFinished {
        command: &'static str,
        outcome: CommandOutcome<DomainEvent>,
    },
    /// A local move finished; `intent` is its encoded target.
    MoveFinished {
        intent: (U256, U256),
        outcome: CommandOutcome<DomainEvent>,
    },
    Output(String),
}

/// A running client: pollers, dispatcher, engine and submitter.
pub struct ClientSession<G: LedgerGateway> {
    gateway: Arc<G>,
    contract: Address,
    signatures: Vec<EventSignature>,
    poller_config: PollerConfig,
    frame_interval: Duration,
    state_log_interval: Duration,
    engine: ReconciliationEngine,
    dispatcher: Dispatcher<ReconciliationEngine>,
    submitter: CommandSubmitter<G>,
    pollers: Vec<PollerHandle<G>>,
    events_tx: mpsc::UnboundedSender<DomainEvent>,
    events_rx: mpsc::UnboundedReceiver<DomainEvent>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
    updates_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    output: mpsc::UnboundedSender<String>,
}

impl<G: LedgerGateway> ClientSession<G> {
    /// Build a session. Configuration errors surface here, before any task
    /// is spawned.
    pub fn new(
        gateway: Arc<G>,
        config: &ClientConfig,
        output: mpsc::UnboundedSender<String>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let contract = config.contract.ok_or(ConfigError::MissingContract)?;
        let account = config.account.ok_or(ConfigError::MissingAccount)?;

        let engine = ReconciliationEngine::new(account, config.reconcile.clone())?;
        let mut dispatcher = Dispatcher::new();
        register_handlers(&mut dispatcher);
        dispatcher.subscribe_to(EventSignature::RoomCreated, |_, event| {
            if let EventPayload::RoomCreated(created) = &event.payload {
                info!(room = %created.room_id, creator = %created.creator, position = %event.position, "Room created");
            }
        });

        let submitter = CommandSubmitter::new(Arc::clone(&gateway), contract, config.submitter.clone())?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        Ok(Self {
            gateway,
            contract,
            signatures: config.signatures.clone(),
            poller_config: config.poller.clone(),
            frame_interval: config.reconcile.frame_interval(),
            state_log_interval: config.state_log_interval(),
            engine,
            dispatcher,
            submitter,
            pollers: Vec::new(),
            events_tx,
            events_rx,
            updates_tx,
            updates_rx,
            output,
        })
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn local_actor(&self) -> Address {
        self.engine.local_actor()
    }

    /// Start one poller per configured signature.
    pub fn start_pollers(&mut self) -> Result<(), SessionError> {
        for signature in &self.signatures {
            let poller = EventPoller::new(
                Arc::clone(&self.gateway),
                self.contract,
                *signature,
                self.poller_config.clone(),
            )?;
            self.pollers.push(poller.start(self.events_tx.clone()));
        }
        info!(pollers = self.pollers.len(), contract = %self.contract, "Pollers started");
        Ok(())
    }

    /// Stop every poller. In-flight cycles finish and their events are
    /// still delivered to the channel.
    pub async fn stop_pollers(&mut self) {
        for handle in self.pollers.drain(..) {
            let signature = handle.signature();
            match handle.stop().await {
                Ok(poller) => {
                    debug!(signature = %signature, watermark = ?poller.watermark(), "Poller stopped");
                }
                Err(e) => warn!(signature = %signature, error = %e, "Poller did not stop cleanly"),
            }
        }
    }

    /// Dispatch one decoded event.
    pub fn handle_event(&mut self, event: &DomainEvent) {
        self.dispatcher.publish(&mut self.engine, event);
        self.request_seed_if_needed();
    }

    fn request_seed_if_needed(&mut self) {
        let Some(room) = self.engine.take_seed_request() else {
            return;
        };
        let gateway = Arc::clone(&self.gateway);
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            let update = match fetch_room_seed(gateway.as_ref(), room).await {
                Ok(seed) => SessionUpdate::Seed(seed),
                Err(error) => SessionUpdate::SeedFailed { room, error },
            };
            let _ = updates.send(update);
        });
    }

    /// Apply the result of off-loop work.
    pub fn handle_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Seed(seed) => {
                self.engine.seed_occupants(seed.room, &seed.occupants);
            }
            SessionUpdate::SeedFailed { room, error } => {
                self.emit(format!("could not list players of room {room}: {error}"));
            }
            SessionUpdate::MoveFinished { intent, outcome } => {
                if !outcome.is_confirmed() {
                    self.engine.abandon_intent(intent);
                }
                self.handle_update(SessionUpdate::CommandFinished {
                    command: "move",
                    outcome,
                });
            }
            SessionUpdate::CommandFinished { command, outcome } => match outcome {
                CommandOutcome::Confirmed { event, .. } => {
                    self.emit(format!("{command} confirmed at {}", event.position));
                    if let EventPayload::RoomCreated(created) = &event.payload {
                        self.emit(format!("room {} created", created.room_id));
                    }
                    self.handle_event(&event);
                }
                CommandOutcome::Unconfirmed { tx_hash, warning } => {
                    self.emit(format!("{command} committed in {tx_hash} but unconfirmed: {warning}"));
                }
                CommandOutcome::Failed(e) => {
                    self.emit(format!("{command} failed: {e}"));
                }
            },
            SessionUpdate::Output(text) => self.emit(text),
        }
    }

    /// Execute a console command. Returns `false` for `quit`.
    pub fn execute(&mut self, command: ClientCommand) -> bool {
        match command {
            ClientCommand::Create { name } => self.spawn_submission(RoomCommand::CreateRoom { name }),
            ClientCommand::Enter { room, name } => {
                self.spawn_submission(RoomCommand::EnterRoom { room_id: room, name });
            }
            ClientCommand::Move { x, y } => match self.engine.set_local_target(x, y) {
                Ok(intent) => {
                    let submitter = self.submitter.clone();
                    let updates = self.updates_tx.clone();
                    tokio::spawn(async move {
                        let outcome = submitter.move_to(x, y).await.into_event();
                        let _ = updates.send(SessionUpdate::MoveFinished { intent, outcome });
                    });
                }
                Err(e) => self.emit(format!("cannot move: {e}")),
            },
            ClientCommand::Rooms => {
                let gateway = Arc::clone(&self.gateway);
                let updates = self.updates_tx.clone();
                tokio::spawn(async move {
                    let text = match gateway.get_all_rooms().await {
                        Ok(rooms) if rooms.is_empty() => "no rooms".to_string(),
                        Ok(rooms) => rooms
                            .iter()
                            .map(|r| format!("{}: {}", r.id, r.name))
                            .collect::<Vec<_>>()
                            .join("\n"),
                        Err(e) => format!("could not list rooms: {e}"),
                    };
                    let _ = updates.send(SessionUpdate::Output(text));
                });
            }
            ClientCommand::Players => match self.engine.current_room() {
                Some(room) => {
                    let gateway = Arc::clone(&self.gateway);
                    let updates = self.updates_tx.clone();
                    tokio::spawn(async move {
                        let text = match gateway.get_room_players(room).await {
                            Ok(players) => players
                                .iter()
                                .map(|p| format!("{} {:?} raw=({}, {})", p.address, p.name, p.x, p.y))
                                .collect::<Vec<_>>()
                                .join("\n"),
                            Err(e) => format!("could not list players: {e}"),
                        };
                        let _ = updates.send(SessionUpdate::Output(text));
                    });
                }
                None => self.emit("not in a room".to_string()),
            },
            ClientCommand::State => self.emit(self.render_state()),
            ClientCommand::Metrics => match encode_metrics() {
                Ok(text) => self.emit(text),
                Err(e) => self.emit(format!("metrics unavailable: {e}")),
            },
            ClientCommand::Help => self.emit(HELP.to_string()),
            ClientCommand::Quit => return false,
        }
        true
    }

    fn spawn_submission(&self, command: RoomCommand) {
        let submitter = self.submitter.clone();
        let updates = self.updates_tx.clone();
        tokio::spawn(async move {
            let name = command.name();
            let outcome = submitter.submit(command).await;
            let _ = updates.send(SessionUpdate::CommandFinished { command: name, outcome });
        });
    }

    /// Advance motion by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.engine.step(dt);
    }

    /// Wait for the next event or update and handle it.
    ///
    /// Returns `false` if nothing arrives within `timeout`.
    pub async fn process_next(&mut self, timeout: Duration) -> bool {
        tokio::select! {
            Some(event) = self.events_rx.recv() => {
                self.handle_event(&event);
                true
            }
            Some(update) = self.updates_rx.recv() => {
                self.handle_update(update);
                true
            }
            _ = tokio::time::sleep(timeout) => false,
        }
    }

    /// Run until `quit`, end of input, or `shutdown`.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<ClientCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError> {
        self.start_pollers()?;

        let mut frame = tokio::time::interval(self.frame_interval);
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut state_log = tokio::time::interval(self.state_log_interval);
        state_log.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => self.handle_event(&event),
                Some(update) = self.updates_rx.recv() => self.handle_update(update),
                _ = frame.tick() => {
                    let now = Instant::now();
                    self.engine.step(now.duration_since(last_frame).as_secs_f64());
                    last_frame = now;
                }
                _ = state_log.tick() => self.log_state(),
                command = input.recv() => match command {
                    Some(command) => {
                        if !self.execute(command) {
                            break;
                        }
                    }
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Session stopping");
        self.stop_pollers().await;
        Ok(())
    }

    fn log_state(&self) {
        let store = self.engine.store();
        match store.get_self() {
            Some(me) => info!(
                room = ?self.engine.current_room(),
                entities = store.len(),
                position = %me.position,
                status = ?me.movement_status,
                "Session state"
            ),
            None => info!(entities = store.len(), "Session state: not in a room"),
        }
    }

    /// Human-readable dump of the entity store.
    pub fn render_state(&self) -> String {
        let store = self.engine.store();
        let mut text = match self.engine.current_room() {
            Some(room) => format!("room {room}, {} entities", store.len()),
            None => "not in a room".to_string(),
        };
        for entity in store.all() {
            let marker = if Some(entity.address) == store.self_address() {
                "*"
            } else {
                " "
            };
            let _ = write!(text, "\n{marker} {entity}");
        }
        text
    }

    fn emit(&self, text: String) {
        if self.output.send(text).is_err() {
            debug!("Output closed");
        }
    }
}
