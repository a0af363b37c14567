//! Authoritative world state and input buffer

use std::collections::BTreeMap;
use std::net::SocketAddr;

use tokio::time::Instant;
use tracing::warn;

use crate::util::time::millis_between;
use crate::ws::protocol::{Direction, Game, Identity, Position};

use super::physics::PhysicsSystem;
use super::registry::ConnectionRegistry;

/// Identity -> position, the simulation's source of truth
pub type WorldState = BTreeMap<Identity, Position>;

/// Identity -> last received direction. Overwritten, never queued.
pub type InputBuffer = BTreeMap<Identity, Direction>;

/// Errors from world operations. All of them are per-message failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("Unknown identity: {0}")]
    UnknownIdentity(Identity),

    #[error("World task has shut down")]
    Closed,
}

/// Server state (owned by the world task)
#[derive(Debug)]
pub struct World {
    registry: ConnectionRegistry,
    positions: WorldState,
    inputs: InputBuffer,
    last_tick: Instant,
}

impl World {
    pub fn new(started_at: Instant) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            positions: WorldState::new(),
            inputs: InputBuffer::new(),
            last_tick: started_at,
        }
    }

    /// Register a connection and spawn its entity at `(id, 0, 0)`
    pub fn join(&mut self, peer: Option<SocketAddr>) -> Identity {
        let id = self.registry.register(peer);
        self.positions.insert(id, Position::spawn(id));
        id
    }

    /// Record a closed connection.
    ///
    /// Position and input entries are kept: there is no despawn.
    pub fn leave(&mut self, id: Identity) {
        self.registry.mark_disconnected(id);
    }

    /// Overwrite the buffered direction for `id`
    pub fn set_input(&mut self, id: Identity, direction: Direction) -> Result<(), WorldError> {
        if !self.positions.contains_key(&id) {
            return Err(WorldError::UnknownIdentity(id));
        }
        self.inputs.insert(id, direction);
        Ok(())
    }

    /// Run one simulation step with wall-clock delta since the previous step.
    ///
    /// Returns the delta that was integrated, in milliseconds.
    pub fn tick(&mut self, now: Instant) -> f64 {
        let delta_ms = millis_between(self.last_tick, now);
        self.last_tick = now;

        for (id, direction) in &self.inputs {
            match self.positions.get_mut(id) {
                Some(position) => {
                    if !PhysicsSystem::integrate(position, *direction, delta_ms) {
                        warn!(identity = *id, ?direction, "Step leaves finite range, position held");
                    }
                }
                None => {
                    let err = WorldError::UnknownIdentity(*id);
                    warn!(identity = *id, error = %err, "Buffered input has no position");
                }
            }
        }

        delta_ms
    }

    /// Owned copy of the world for broadcasting
    pub fn snapshot(&self) -> Game {
        Game {
            positions: self.positions.clone(),
        }
    }

    pub fn position(&self, id: Identity) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn input(&self, id: Identity) -> Option<Direction> {
        self.inputs.get(&id).copied()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn entity_count(&self) -> usize {
        self.positions.len()
    }
}
