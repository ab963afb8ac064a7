//! # Motion Stepping
//!
//! Continuous-time movement toward a target at constant speed.
//!
//! ```text
//! remaining = |target - position|
//! if remaining <= speed * dt:  position = target, target = none, Idle
//! else:                        position += unit(target - position) * speed * dt, Walking
//! ```

use crate::domain::{Entity, Facing, MovementStatus};

/// What one step did to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing moved this step.
    Idle,
    /// Moved toward the target without reaching it.
    Moved,
    /// Snapped onto the target this step.
    Arrived,
}

/// Facing from the dominant axis of motion. Ties go horizontal.
#[must_use]
pub fn facing_for(dx: f64, dy: f64) -> Facing {
    if dy.abs() > dx.abs() {
        if dy > 0.0 {
            Facing::Down
        } else {
            Facing::Up
        }
    } else if dx > 0.0 {
        Facing::Right
    } else {
        Facing::Left
    }
}

/// Advance `entity` by `dt` seconds at `speed` units per second.
///
/// Non-positive or non-finite `dt` leaves the entity untouched.
pub fn step(entity: &mut Entity, speed: f64, dt: f64) -> StepOutcome {
    let Some(target) = entity.target else {
        entity.movement_status = MovementStatus::Idle;
        return StepOutcome::Idle;
    };
    if !(dt.is_finite() && dt > 0.0) {
        return StepOutcome::Idle;
    }

    let dx = target.x - entity.position.x;
    let dy = target.y - entity.position.y;
    let remaining = dx.hypot(dy);
    let reach = speed * dt;

    if remaining <= reach {
        entity.position = target;
        entity.target = None;
        entity.movement_status = MovementStatus::Idle;
        return StepOutcome::Arrived;
    }

    let scale = reach / remaining;
    entity.position.x += dx * scale;
    entity.position.y += dy * scale;
    entity.movement_status = MovementStatus::Walking;
    entity.facing = facing_for(dx, dy);
    StepOutcome::Moved
}
