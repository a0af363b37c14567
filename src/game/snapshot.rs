//! Snapshot building and broadcast accounting

use crate::ws::protocol::ServerMsg;

use super::world::World;

/// Builds full-world snapshots for the broadcast publisher.
///
/// Every snapshot is the complete world: no deltas, no per-recipient
/// filtering. Aggregate traffic grows with connections × entities.
pub struct SnapshotBuilder {
    stats: SnapshotStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            stats: SnapshotStats::default(),
        }
    }

    /// Build a snapshot message and account for its fan-out
    pub fn build(&mut self, world: &World, recipients: usize) -> ServerMsg {
        let game = world.snapshot();
        self.stats.record(game.positions.len(), recipients);
        ServerMsg::GameUpdate { game }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Broadcast stats for debugging
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    /// Snapshot copies handed to connections
    pub total_deliveries: u64,
    /// Entity records across all deliveries
    pub total_entity_records: u64,
    pub avg_entities_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, entity_count: usize, recipients: usize) {
        self.total_snapshots += 1;
        self.total_deliveries += recipients as u64;
        self.total_entity_records += (entity_count * recipients) as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_entities_per_snapshot =
            self.avg_entities_per_snapshot * ((n - 1.0) / n) + (entity_count as f32 / n);
    }
}
