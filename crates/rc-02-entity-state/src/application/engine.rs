//! # Reconciliation Engine
//!
//! Merges locally predicted motion with confirmed ledger events.
//!
//! ## Merge Rules
//!
//! | Event | Subject | Effect |
//! |-------|---------|--------|
//! | `PlayerEntered` | local actor | enter room: drop other occupants, create self, request a seed |
//! | `PlayerEntered` | other, same room | create entity at the origin |
//! | `PlayerMoved` | other, same room | record confirmation, retarget (walk, never teleport) |
//! | `PlayerMoved` | local actor | record confirmation only |
//! | any | other room / not in a room | ignored |
//! | `PlayerMoved` at or before last confirmation | any | no-op |
//!
//! Confirmations for the local actor never move it immediately. Under
//! [`SelfCorrectionPolicy::RetargetAfterTimeout`] the actor walks back to its
//! confirmed position once it has been idle and out of tolerance long enough.
//! The timer stays stopped while any local move is still awaiting its
//! confirmation, so an older confirmation never pulls the actor back.

use rc_telemetry::{log_event, EVENTS_APPLIED, SELF_CORRECTIONS};
use shared_bus::{DomainEvent, EventPayload, EventSignature, PlayerEntered, PlayerMoved};
use shared_types::{decode_point, encode_point, Address, EventPosition, RoomId, U256};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::algorithms::{step, StepOutcome};
use crate::config::{ReconcileConfig, SelfCorrectionPolicy};
use crate::domain::{ConfirmedPosition, Entity, EntityStateStore, Point, ReconcileError};
use crate::ports::RoomOccupant;

const SUBSYSTEM: &str = "entity-state";

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    /// Existing entity updated.
    Applied,
    /// New entity inserted.
    Created,
    /// Local actor's confirmation recorded; prediction untouched.
    SelfConfirmed,
    /// Already seen; state unchanged.
    Duplicate,
    /// Event belongs to a room the local actor is not in.
    OtherRoom,
    /// The local actor has not entered a room yet.
    NotInRoom,
    /// Coordinates could not be decoded.
    Rejected,
    /// Event carries nothing the engine tracks.
    Informational,
}

impl EventEffect {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Created => "created",
            Self::SelfConfirmed => "self_confirmed",
            Self::Duplicate => "duplicate",
            Self::OtherRoom => "other_room",
            Self::NotInRoom => "not_in_room",
            Self::Rejected => "rejected",
            Self::Informational => "informational",
        }
    }

    /// Whether the store changed.
    pub const fn changed_state(&self) -> bool {
        matches!(self, Self::Applied | Self::Created | Self::SelfConfirmed)
    }
}

/// Result of one frame step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    /// Entities that moved without arriving.
    pub moved: usize,
    /// Entities that reached their target.
    pub arrived: usize,
    /// The local actor was retargeted to its confirmed position.
    pub self_corrected: bool,
}

/// Owns the entity store and applies events and frame steps to it.
#[derive(Debug)]
pub struct ReconciliationEngine {
    config: ReconcileConfig,
    store: EntityStateStore,
    local_actor: Address,
    room: Option<RoomId>,
    seed_request: Option<RoomId>,
    /// Position of the entry that put the local actor in `room`.
    self_entered_at: Option<EventPosition>,
    /// Stepped seconds the idle self has spent out of tolerance.
    divergence_secs: f64,
    /// Encoded targets of local moves not yet confirmed, oldest first.
    pending_moves: VecDeque<(U256, U256)>,
}

impl ReconciliationEngine {
    pub fn new(local_actor: Address, config: ReconcileConfig) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self {
            config,
            store: EntityStateStore::new(),
            local_actor,
            room: None,
            seed_request: None,
            self_entered_at: None,
            divergence_secs: 0.0,
            pending_moves: VecDeque::new(),
        })
    }

    pub fn local_actor(&self) -> Address {
        self.local_actor
    }

    pub fn current_room(&self) -> Option<RoomId> {
        self.room
    }

    pub fn store(&self) -> &EntityStateStore {
        &self.store
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Apply any decoded event.
    pub fn apply(&mut self, event: &DomainEvent) -> EventEffect {
        match &event.payload {
            EventPayload::PlayerEntered(e) => self.on_player_entered(e, event.position),
            EventPayload::PlayerMoved(e) => self.on_player_moved(e, event.position),
            EventPayload::RoomCreated(_) => {
                record(EventSignature::RoomCreated, EventEffect::Informational)
            }
        }
    }

    pub fn on_player_entered(&mut self, event: &PlayerEntered, at: EventPosition) -> EventEffect {
        let effect = if event.player == self.local_actor {
            self.enter_self(event, at)
        } else {
            match self.room {
                None => EventEffect::NotInRoom,
                Some(room) if room != event.room_id => EventEffect::OtherRoom,
                Some(_) => match self.store.find_mut(&event.player) {
                    Some(existing) => {
                        existing.name.clone_from(&event.name);
                        EventEffect::Duplicate
                    }
                    None => {
                        self.store.upsert(
                            event.player,
                            Entity::new(event.player, event.name.clone(), Point::ORIGIN),
                        );
                        log_event!(
                            info,
                            SUBSYSTEM,
                            "Player entered",
                            player = %event.player,
                            name = %event.name,
                            position = %at
                        );
                        EventEffect::Created
                    }
                },
            }
        };
        record(EventSignature::PlayerEntered, effect)
    }

    fn enter_self(&mut self, event: &PlayerEntered, at: EventPosition) -> EventEffect {
        let me = self.local_actor;
        // Entries reach the engine both from receipts and from the poller.
        if self.self_entered_at.is_some_and(|last| at <= last) {
            return EventEffect::Duplicate;
        }
        if self.room == Some(event.room_id) && self.store.contains(&me) {
            if let Some(entity) = self.store.find_mut(&me) {
                entity.name.clone_from(&event.name);
            }
            self.self_entered_at = Some(at);
            return EventEffect::Duplicate;
        }

        if let Some(previous) = self.room {
            log_event!(info, SUBSYSTEM, "Leaving room", room = %previous);
        }
        self.store.clear();
        self.store
            .upsert(me, Entity::new(me, event.name.clone(), Point::ORIGIN));
        self.store.set_self(Some(me));
        self.room = Some(event.room_id);
        self.seed_request = Some(event.room_id);
        self.self_entered_at = Some(at);
        self.divergence_secs = 0.0;
        self.pending_moves.clear();

        log_event!(
            info,
            SUBSYSTEM,
            "Local actor entered room",
            room = %event.room_id,
            name = %event.name,
            position = %at
        );
        EventEffect::Created
    }

    pub fn on_player_moved(&mut self, event: &PlayerMoved, at: EventPosition) -> EventEffect {
        let effect = self.apply_moved(event, at);
        record(EventSignature::PlayerMoved, effect)
    }

    fn apply_moved(&mut self, event: &PlayerMoved, at: EventPosition) -> EventEffect {
        match self.room {
            None => return EventEffect::NotInRoom,
            Some(room) if room != event.room_id => return EventEffect::OtherRoom,
            Some(_) => {}
        }

        let point = match decode_point(event.x, event.y) {
            Ok(ints) => Point::from_ints(ints),
            Err(e) => {
                warn!(subsystem = SUBSYSTEM, player = %event.player, position = %at, error = %e, "Undecodable move");
                return EventEffect::Rejected;
            }
        };
        let confirmed = ConfirmedPosition { point, at };

        if event.player == self.local_actor {
            let Some(me) = self.store.find_mut(&event.player) else {
                return EventEffect::NotInRoom;
            };
            if !me.is_newer_confirmation(at) {
                return EventEffect::Duplicate;
            }
            me.last_confirmed = Some(confirmed);
            debug!(subsystem = SUBSYSTEM, confirmed = %point, predicted = %me.position, "Self move confirmed");
            // Moves from one account are mined in order: everything up to the
            // matching intent is settled.
            if let Some(idx) = self.pending_moves.iter().position(|raw| *raw == (event.x, event.y)) {
                self.pending_moves.drain(..=idx);
            }
            return EventEffect::SelfConfirmed;
        }

        match self.store.find_mut(&event.player) {
            Some(entity) => {
                if !entity.is_newer_confirmation(at) {
                    return EventEffect::Duplicate;
                }
                entity.last_confirmed = Some(confirmed);
                entity.set_target(point);
                EventEffect::Applied
            }
            None => {
                // No prior position to walk from.
                let mut entity = Entity::new(event.player, String::new(), point);
                entity.last_confirmed = Some(confirmed);
                self.store.upsert(event.player, entity);
                EventEffect::Created
            }
        }
    }

    /// Local move intent: retarget the local actor immediately.
    ///
    /// Targets the contract cannot represent are refused before any state
    /// changes. Returns the encoded coordinates the move will be submitted
    /// with; the intent stays pending until a confirmation with exactly those
    /// coordinates arrives or [`Self::abandon_intent`] is called.
    pub fn set_local_target(&mut self, x: f64, y: f64) -> Result<(U256, U256), ReconcileError> {
        let target = Point::new(x, y);
        if !target.is_finite() {
            return Err(ReconcileError::InvalidTarget { x, y });
        }
        let raw = encode_point(x, y)?;
        let me = self.store.get_self_mut().ok_or(ReconcileError::NoSelf)?;
        me.set_target(target);
        self.divergence_secs = 0.0;
        self.pending_moves.push_back(raw);
        Ok(raw)
    }

    /// Forget a local move that will never be confirmed (reverted, rejected
    /// or committed without a matching event). Returns false if it was not
    /// pending.
    pub fn abandon_intent(&mut self, raw: (U256, U256)) -> bool {
        match self.pending_moves.iter().position(|pending| *pending == raw) {
            Some(idx) => {
                self.pending_moves.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Local moves still awaiting confirmation.
    pub fn pending_intents(&self) -> usize {
        self.pending_moves.len()
    }

    /// Advance every entity by `dt` seconds, then check self divergence.
    pub fn step(&mut self, dt: f64) -> StepSummary {
        let speed = self.config.speed;
        let mut summary = StepSummary::default();
        for entity in self.store.all_mut() {
            match step(entity, speed, dt) {
                StepOutcome::Moved => summary.moved += 1,
                StepOutcome::Arrived => summary.arrived += 1,
                StepOutcome::Idle => {}
            }
        }
        summary.self_corrected = self.check_self_divergence(dt);
        summary
    }

    fn check_self_divergence(&mut self, dt: f64) -> bool {
        if self.config.self_correction == SelfCorrectionPolicy::Ignore {
            return false;
        }
        if !self.pending_moves.is_empty() {
            self.divergence_secs = 0.0;
            return false;
        }
        let tolerance = self.config.self_tolerance;
        let timeout = self.config.self_correction_timeout_secs();

        let Some(me) = self.store.get_self_mut() else {
            self.divergence_secs = 0.0;
            return false;
        };
        let Some(confirmed) = me.last_confirmed else {
            self.divergence_secs = 0.0;
            return false;
        };
        if me.is_moving() || me.position.distance_to(&confirmed.point) <= tolerance {
            self.divergence_secs = 0.0;
            return false;
        }
        if !(dt.is_finite() && dt > 0.0) {
            return false;
        }

        self.divergence_secs += dt;
        if self.divergence_secs < timeout {
            return false;
        }

        warn!(
            subsystem = SUBSYSTEM,
            predicted = %me.position,
            confirmed = %confirmed.point,
            confirmed_at = %confirmed.at,
            "Local actor diverged from confirmed position, retargeting"
        );
        me.set_target(confirmed.point);
        self.divergence_secs = 0.0;
        SELF_CORRECTIONS.inc();
        true
    }

    /// The room whose occupants should be fetched, once per entry.
    pub fn take_seed_request(&mut self) -> Option<RoomId> {
        self.seed_request.take()
    }

    /// Seed occupants from a room listing.
    ///
    /// Positions are de-offset. The local actor is skipped. Occupants already
    /// known from events keep their event-derived state. A listing for a room
    /// the actor has since left is dropped. Returns the number inserted.
    pub fn seed_occupants(&mut self, room: RoomId, occupants: &[RoomOccupant]) -> usize {
        if self.room != Some(room) {
            debug!(subsystem = SUBSYSTEM, room = %room, "Dropping stale room listing");
            return 0;
        }

        let mut inserted = 0;
        for occupant in occupants {
            if occupant.address == self.local_actor {
                continue;
            }
            if let Some(existing) = self.store.find_mut(&occupant.address) {
                if existing.name.is_empty() {
                    existing.name.clone_from(&occupant.name);
                }
                continue;
            }
            match decode_point(occupant.x, occupant.y) {
                Ok(ints) => {
                    self.store.upsert(
                        occupant.address,
                        Entity::new(occupant.address, occupant.name.clone(), Point::from_ints(ints)),
                    );
                    inserted += 1;
                }
                Err(e) => {
                    warn!(subsystem = SUBSYSTEM, player = %occupant.address, error = %e, "Skipping occupant with bad coordinates");
                }
            }
        }

        log_event!(
            info,
            SUBSYSTEM,
            "Room occupants seeded",
            room = %room,
            listed = occupants.len(),
            inserted = inserted
        );
        inserted
    }
}

fn record(signature: EventSignature, effect: EventEffect) -> EventEffect {
    EVENTS_APPLIED
        .with_label_values(&[signature.name(), effect.label()])
        .inc();
    effect
}
