//! Time utilities for the simulation

use std::time::Duration;

use tokio::time::Instant;

/// Default simulation tick interval
pub const TICK_INTERVAL_MS: u64 = 10;
/// Default snapshot broadcast interval
pub const BROADCAST_INTERVAL_MS: u64 = 10;

/// Elapsed wall-clock time between two instants, in fractional milliseconds.
///
/// Saturates to zero if `later` is before `earlier`.
pub fn millis_between(earlier: Instant, later: Instant) -> f64 {
    later.saturating_duration_since(earlier).as_secs_f64() * 1000.0
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
