//! Client connection state machine
//!
//! Routes decoded server messages into the mirror and turns sampled
//! directions into outgoing `playerInput` messages. Transport I/O is left to
//! the caller so the same session drives a headless bot or a renderer.

use tracing::{debug, info, warn};

use crate::ws::protocol::{ClientMsg, Direction, Identity, PlayerInput, ServerMsg};

use super::input::{InputSampler, KeyEdge};
use super::mirror::{ClientMirror, Placeable, ReconcileReport};

/// Connection lifecycle on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Joined(Identity),
    Disconnected,
}

/// What handling one server message produced
#[derive(Debug, Default, PartialEq)]
pub struct Handled {
    /// Messages to send back (a pending input flushed on join)
    pub outgoing: Vec<ClientMsg>,
    /// Mirror changes, when the message was a snapshot
    pub reconciled: Option<ReconcileReport>,
}

pub struct ClientSession<E> {
    state: ClientState,
    sampler: InputSampler,
    mirror: ClientMirror<E>,
    /// Latest direction produced before an identity was known
    pending: Option<Direction>,
}

impl<E: Placeable + Clone> ClientSession<E> {
    pub fn new(template: E) -> Self {
        Self {
            state: ClientState::Connecting,
            sampler: InputSampler::new(),
            mirror: ClientMirror::new(template),
            pending: None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn identity(&self) -> Option<Identity> {
        match self.state {
            ClientState::Joined(id) => Some(id),
            _ => None,
        }
    }

    pub fn mirror(&self) -> &ClientMirror<E> {
        &self.mirror
    }

    /// Apply one message from the server
    pub fn on_server_msg(&mut self, msg: ServerMsg) -> Handled {
        let mut handled = Handled::default();

        match (self.state, msg) {
            (ClientState::Disconnected, msg) => {
                debug!(?msg, "Ignoring message after disconnect");
            }
            (ClientState::Connecting, ServerMsg::InitClient { id }) => {
                info!(identity = id, "Joined");
                self.state = ClientState::Joined(id);
                if let Some(direction) = self.pending.take() {
                    handled.outgoing.push(input_msg(id, direction));
                }
            }
            (ClientState::Joined(current), ServerMsg::InitClient { id }) => {
                warn!(identity = current, offered = id, "Ignoring second identity assignment");
            }
            (_, ServerMsg::GameUpdate { game }) => {
                let report = self.mirror.reconcile(&game);
                if !report.spawned.is_empty() {
                    debug!(spawned = ?report.spawned, "Mirrored new entities");
                }
                handled.reconciled = Some(report);
            }
            (_, ServerMsg::Unknown) => {
                debug!("Ignoring message with unknown type");
            }
        }

        handled
    }

    /// Apply a key edge. Returns a message to send if the direction changed
    /// and an identity is known; otherwise the change waits in the pending
    /// slot, replacing anything older.
    pub fn on_key(&mut self, edge: KeyEdge) -> Option<ClientMsg> {
        let direction = self.sampler.on_edge(edge)?;
        match self.state {
            ClientState::Joined(id) => Some(input_msg(id, direction)),
            ClientState::Connecting => {
                self.pending = Some(direction);
                None
            }
            ClientState::Disconnected => None,
        }
    }

    /// Transport closed. Mirror entries are kept.
    pub fn on_disconnect(&mut self) {
        if self.state != ClientState::Disconnected {
            info!(identity = ?self.identity(), "Disconnected");
        }
        self.state = ClientState::Disconnected;
        self.pending = None;
    }
}

fn input_msg(id: Identity, direction: Direction) -> ClientMsg {
    ClientMsg::PlayerInput {
        id,
        input: PlayerInput { direction },
    }
}
