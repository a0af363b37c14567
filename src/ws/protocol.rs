//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Per-connection participant handle, assigned by the server at join time
pub type Identity = u32;

/// World-space position of a participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Deterministic spawn point for a freshly assigned identity
    pub fn spawn(id: Identity) -> Self {
        Self::new(id as f64, 0.0, 0.0)
    }

    /// JSON has no encoding for inf/NaN; they serialize as `null`
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unnormalized per-axis movement intent.
///
/// Each component is -1, 0 or 1 when produced by the key sampler. Diagonal
/// input is deliberately left at magnitude √2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Direction {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Input payload carried by a `playerInput` message
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub direction: Direction,
}

/// Full world snapshot as sent on the wire.
///
/// Identities become JSON object keys (`"1": {...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(deserialize_with = "identity_keys")]
    pub positions: BTreeMap<Identity, Position>,
}

/// Read identity-keyed maps through string keys.
///
/// Inside an internally tagged enum the payload is buffered first, and the
/// buffered keys stay strings, so they are parsed here.
fn identity_keys<'de, D>(deserializer: D) -> Result<BTreeMap<Identity, Position>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    BTreeMap::<String, Position>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, position)| {
            key.parse::<Identity>()
                .map(|id| (id, position))
                .map_err(|_| D::Error::custom(format!("invalid identity key: {:?}", key)))
        })
        .collect()
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Latest direction held by the sending participant
    PlayerInput { id: Identity, input: PlayerInput },

    /// Any tag this build does not know about
    #[serde(other)]
    Unknown,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Identity assignment, unicast once right after the connection is accepted
    InitClient { id: Identity },

    /// Snapshot broadcast to every connection on each publish tick
    GameUpdate { game: Game },

    /// Any tag this build does not know about
    #[serde(other)]
    Unknown,
}
