//! Motion integration

use crate::ws::protocol::{Direction, Position};

/// Movement speed in distance units per millisecond
pub const SPEED: f64 = 0.001;

/// Physics system for advancing positions from held directions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a position by `direction * delta_ms * SPEED`.
    ///
    /// This is a wall-clock integrator, not lockstep: the same inputs under
    /// different tick timing give slightly different results. A step whose
    /// result is not finite is not applied, and `false` is returned.
    pub fn integrate(position: &mut Position, direction: Direction, delta_ms: f64) -> bool {
        let scale = delta_ms * SPEED;
        let next = Position::new(
            position.x + direction.x * scale,
            position.y + direction.y * scale,
            position.z + direction.z * scale,
        );
        if !next.is_finite() {
            return false;
        }
        *position = next;
        true
    }
}
