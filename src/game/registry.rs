//! Connection registry: identity assignment and connection lifecycle

use std::collections::BTreeMap;
use std::net::SocketAddr;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::ws::protocol::Identity;

/// Connection lifecycle as seen by the server.
///
/// `Connecting` is the window before the registry has handed out an identity,
/// so registered entries are only ever `Joined` or `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Joined,
    Disconnected,
}

/// Registry entry for one accepted connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: Identity,
    pub peer: Option<SocketAddr>,
    pub joined_at: Instant,
    pub state: ConnectionState,
}

/// Assigns identities and tracks every connection ever registered.
///
/// Identities start at 1 and are never reused. Entries are not removed on
/// disconnect; they move to [`ConnectionState::Disconnected`].
#[derive(Debug)]
pub struct ConnectionRegistry {
    next_id: Identity,
    connections: BTreeMap<Identity, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            connections: BTreeMap::new(),
        }
    }

    /// Allocate the next identity for a newly accepted connection
    pub fn register(&mut self, peer: Option<SocketAddr>) -> Identity {
        let id = self.next_id;
        self.next_id += 1;

        self.connections.insert(
            id,
            Connection {
                id,
                peer,
                joined_at: Instant::now(),
                state: ConnectionState::Joined,
            },
        );

        info!(identity = id, peer = ?peer, "Connection registered");
        id
    }

    /// Mark a connection as closed. Returns false for unknown identities.
    pub fn mark_disconnected(&mut self, id: Identity) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) => {
                conn.state = ConnectionState::Disconnected;
                info!(
                    identity = id,
                    connected_for_ms = conn.joined_at.elapsed().as_millis() as u64,
                    "Connection closed"
                );
                true
            }
            None => {
                warn!(identity = id, "Disconnect for unknown identity");
                false
            }
        }
    }

    pub fn get(&self, id: Identity) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn state_of(&self, id: Identity) -> Option<ConnectionState> {
        self.connections.get(&id).map(|c| c.state)
    }

    /// Number of identities ever registered
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Number of connections still open
    pub fn live_count(&self) -> usize {
        self.connections
            .values()
            .filter(|c| c.state == ConnectionState::Joined)
            .count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
