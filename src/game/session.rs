//! World task: the single owner of server state, with its tick and broadcast loops

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::util::time::Timer;
use crate::ws::protocol::{ClientMsg, Identity, ServerMsg};

use super::snapshot::SnapshotBuilder;
use super::world::{World, WorldError};

/// Log broadcast stats every this many snapshots
const STATS_LOG_EVERY: u64 = 1_000;

/// Commands sent from connection tasks to the world task
#[derive(Debug)]
pub enum WorldCommand {
    Join {
        peer: Option<SocketAddr>,
        reply: oneshot::Sender<Joined>,
    },
    Message {
        from: Identity,
        msg: ClientMsg,
    },
    Leave {
        id: Identity,
    },
}

/// Result of a join: the assigned identity and a snapshot subscription
#[derive(Debug)]
pub struct Joined {
    pub id: Identity,
    pub snapshots: broadcast::Receiver<ServerMsg>,
}

/// Handle to the running world task
#[derive(Clone)]
pub struct WorldHandle {
    cmd_tx: mpsc::Sender<WorldCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
}

impl WorldHandle {
    /// Register a new connection.
    ///
    /// The snapshot receiver is subscribed inside the world task, before any
    /// later broadcast, so the first snapshot it sees already includes `id`.
    pub async fn join(&self, peer: Option<SocketAddr>) -> Result<Joined, WorldError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(WorldCommand::Join { peer, reply })
            .await
            .map_err(|_| WorldError::Closed)?;
        rx.await.map_err(|_| WorldError::Closed)
    }

    /// Forward a decoded client message
    pub async fn submit(&self, from: Identity, msg: ClientMsg) -> Result<(), WorldError> {
        self.cmd_tx
            .send(WorldCommand::Message { from, msg })
            .await
            .map_err(|_| WorldError::Closed)
    }

    /// Report a closed connection
    pub async fn leave(&self, id: Identity) -> Result<(), WorldError> {
        self.cmd_tx
            .send(WorldCommand::Leave { id })
            .await
            .map_err(|_| WorldError::Closed)
    }

    /// Number of connections currently subscribed to snapshots
    pub fn subscriber_count(&self) -> usize {
        self.snapshot_tx.receiver_count()
    }
}

/// The authoritative world loop
pub struct WorldSession {
    world: World,
    cmd_rx: mpsc::Receiver<WorldCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    tick_interval: Duration,
    broadcast_interval: Duration,
}

impl WorldSession {
    pub fn new(tick_interval: Duration, broadcast_interval: Duration) -> (Self, WorldHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = WorldHandle {
            cmd_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let session = Self {
            world: World::new(Instant::now()),
            cmd_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(),
            tick_interval,
            broadcast_interval,
        };

        (session, handle)
    }

    /// Run until every [`WorldHandle`] is dropped.
    ///
    /// Commands, simulation ticks and broadcasts are serialized through one
    /// `select!`, so state is never touched concurrently.
    pub async fn run(mut self) {
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            broadcast_ms = self.broadcast_interval.as_millis() as u64,
            "World started"
        );

        let mut tick_timer = interval(self.tick_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast_timer = interval(self.broadcast_interval);
        broadcast_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = tick_timer.tick() => self.run_tick(),
                _ = broadcast_timer.tick() => self.publish(),
            }
        }

        info!(
            registered = self.world.registry().len(),
            snapshots = self.snapshot_builder.stats().total_snapshots,
            "World stopped"
        );
    }

    fn handle_command(&mut self, cmd: WorldCommand) {
        match cmd {
            WorldCommand::Join { peer, reply } => {
                let id = self.world.join(peer);
                let snapshots = self.snapshot_tx.subscribe();
                if reply.send(Joined { id, snapshots }).is_err() {
                    // Connection went away mid-handshake; entity stays as on any other leave
                    warn!(identity = id, "Joiner dropped before receiving identity");
                    self.world.leave(id);
                }
            }
            WorldCommand::Message { from, msg } => self.handle_message(from, msg),
            WorldCommand::Leave { id } => self.world.leave(id),
        }
    }

    fn handle_message(&mut self, from: Identity, msg: ClientMsg) {
        match msg {
            ClientMsg::PlayerInput { id, input } => {
                if id != from {
                    debug!(identity = from, addressed_to = id, "Input addressed to another identity");
                }
                if let Err(e) = self.world.set_input(id, input.direction) {
                    warn!(identity = from, error = %e, "Dropping input");
                }
            }
            ClientMsg::Unknown => {
                debug!(identity = from, "Ignoring message with unknown type");
            }
        }
    }

    fn run_tick(&mut self) {
        let timer = Timer::new();
        let delta_ms = self.world.tick(Instant::now());

        if timer.elapsed() > self.tick_interval {
            warn!(
                tick_micros = timer.elapsed_micros(),
                delta_ms, "Simulation tick overran its interval"
            );
        }
    }

    fn publish(&mut self) {
        let recipients = self.snapshot_tx.receiver_count();
        if recipients == 0 {
            return;
        }

        let snapshot = self.snapshot_builder.build(&self.world, recipients);
        // Errors only when no receivers remain
        let _ = self.snapshot_tx.send(snapshot);

        let stats = self.snapshot_builder.stats();
        if stats.total_snapshots % STATS_LOG_EVERY == 0 {
            debug!(
                snapshots = stats.total_snapshots,
                deliveries = stats.total_deliveries,
                entity_records = stats.total_entity_records,
                avg_entities = stats.avg_entities_per_snapshot,
                "Broadcast stats"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{Direction, Game, PlayerInput, Position};

    fn spawn_world() -> WorldHandle {
        let (session, handle) =
            WorldSession::new(Duration::from_millis(5), Duration::from_millis(5));
        tokio::spawn(session.run());
        handle
    }

    /// Wait for the next snapshot that satisfies `pred`
    async fn next_update_where(
        rx: &mut broadcast::Receiver<ServerMsg>,
        pred: impl Fn(&Game) -> bool,
    ) -> Game {
        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(ServerMsg::GameUpdate { game }) if pred(&game) => return game,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("snapshot channel closed"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("timed out waiting for snapshot")
    }

    #[tokio::test]
    async fn joins_get_sequential_identities() {
        let world = spawn_world();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(world.join(None).await.unwrap().id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn late_joiner_sees_everyone_including_itself() {
        let world = spawn_world();
        let mut first = world.join(None).await.unwrap();
        next_update_where(&mut first.snapshots, |_| true).await;

        let mut late = world.join(None).await.unwrap();
        let game = next_update_where(&mut late.snapshots, |_| true).await;

        let ids: Vec<Identity> = game.positions.keys().copied().collect();
        assert_eq!(ids, vec![first.id, late.id]);
        assert_eq!(game.positions[&late.id], Position::spawn(late.id));
    }

    #[tokio::test]
    async fn input_moves_only_the_sender() {
        let world = spawn_world();
        let mut idle = world.join(None).await.unwrap();
        let mover = world.join(None).await.unwrap();

        world
            .submit(
                mover.id,
                ClientMsg::PlayerInput {
                    id: mover.id,
                    input: PlayerInput {
                        direction: Direction::new(1.0, 0.0, 0.0),
                    },
                },
            )
            .await
            .unwrap();

        let game = next_update_where(&mut idle.snapshots, |g| {
            g.positions.get(&mover.id).map_or(false, |p| p.x > 2.02)
        })
        .await;

        assert_eq!(game.positions[&idle.id], Position::spawn(idle.id));
        let moved = game.positions[&mover.id];
        assert_eq!(moved.y, 0.0);
        assert_eq!(moved.z, 0.0);
    }

    #[tokio::test]
    async fn unknown_messages_and_identities_change_nothing() {
        let world = spawn_world();
        let mut joined = world.join(None).await.unwrap();

        world.submit(joined.id, ClientMsg::Unknown).await.unwrap();
        world
            .submit(
                joined.id,
                ClientMsg::PlayerInput {
                    id: 99,
                    input: PlayerInput {
                        direction: Direction::new(0.0, 0.0, 1.0),
                    },
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let game = next_update_where(&mut joined.snapshots, |_| true).await;

        assert_eq!(game.positions.len(), 1);
        assert_eq!(game.positions[&joined.id], Position::spawn(joined.id));
    }

    #[tokio::test]
    async fn leave_keeps_entity_in_broadcasts() {
        let world = spawn_world();
        let gone = world.join(None).await.unwrap();
        let mut watcher = world.join(None).await.unwrap();

        assert_eq!(world.subscriber_count(), 2);

        world.leave(gone.id).await.unwrap();
        drop(gone.snapshots);
        assert_eq!(world.subscriber_count(), 1);

        let game = next_update_where(&mut watcher.snapshots, |_| true).await;
        assert!(game.positions.contains_key(&gone.id));
    }
}
