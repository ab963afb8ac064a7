//! # Entity
//!
//! One player as seen by this client: where it is drawn now, where it is
//! heading, and the last position the ledger confirmed for it.

use serde::{Deserialize, Serialize};
use shared_types::{Address, EventPosition};
use std::fmt;

/// A point in client world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point from decoded integer coordinates.
    #[must_use]
    pub fn from_ints((x, y): (i64, i64)) -> Self {
        Self::new(x as f64, y as f64)
    }

    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Movement animation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementStatus {
    #[default]
    Idle,
    Walking,
    Running,
}

/// Direction the entity is facing. Screen coordinates: `+y` is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

/// The latest authoritative position seen for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedPosition {
    /// Decoded (de-offset) coordinates.
    pub point: Point,
    /// Ledger position of the event that confirmed it.
    pub at: EventPosition,
}

/// A player entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical address, the store key.
    pub address: Address,
    /// Display name from `PlayerEntered` or the room listing.
    pub name: String,
    /// Rendered (predicted) position.
    pub position: Point,
    /// Predicted target; `None` when idle.
    pub target: Option<Point>,
    pub movement_status: MovementStatus,
    pub facing: Facing,
    /// Authoritative position, arriving out of band.
    pub last_confirmed: Option<ConfirmedPosition>,
}

impl Entity {
    /// New idle entity at `position`.
    pub fn new(address: Address, name: impl Into<String>, position: Point) -> Self {
        Self {
            address,
            name: name.into(),
            position,
            target: None,
            movement_status: MovementStatus::Idle,
            facing: Facing::default(),
            last_confirmed: None,
        }
    }

    pub fn set_target(&mut self, target: Point) {
        self.target = Some(target);
    }

    pub fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Whether an event at `at` is newer than the last confirmation.
    pub fn is_newer_confirmation(&self, at: EventPosition) -> bool {
        self.last_confirmed.map_or(true, |c| at > c.at)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} at {} {:?}/{:?}",
            self.address, self.name, self.position, self.movement_status, self.facing
        )?;
        if let Some(target) = self.target {
            write!(f, " -> {target}")?;
        }
        if let Some(confirmed) = self.last_confirmed {
            write!(f, " [confirmed {} @ {}]", confirmed.point, confirmed.at)?;
        }
        Ok(())
    }
}
