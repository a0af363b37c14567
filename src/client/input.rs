//! Client input sampling with edge tracking and change detection

use std::collections::HashSet;

use crate::ws::protocol::Direction;

/// Movement keys. Each axis is driven by one opposing pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Map a key name (WASD or arrow names, case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "w" | "up" | "arrowup" => Some(Key::Up),
            "s" | "down" | "arrowdown" => Some(Key::Down),
            "a" | "left" | "arrowleft" => Some(Key::Left),
            "d" | "right" | "arrowright" => Some(Key::Right),
            _ => None,
        }
    }
}

/// A press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Pressed(Key),
    Released(Key),
}

/// Tracks held keys and emits a direction only when it changes
#[derive(Debug, Default)]
pub struct InputSampler {
    held: HashSet<Key>,
    last_sent: Direction,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an edge event. Returns the new direction if it differs from the
    /// last one returned.
    pub fn on_edge(&mut self, edge: KeyEdge) -> Option<Direction> {
        match edge {
            KeyEdge::Pressed(key) => self.held.insert(key),
            KeyEdge::Released(key) => self.held.remove(&key),
        };

        let direction = self.direction();
        // Exact comparison: components are only ever -1, 0 or 1
        if direction == self.last_sent {
            return None;
        }
        self.last_sent = direction;
        Some(direction)
    }

    pub fn press(&mut self, key: Key) -> Option<Direction> {
        self.on_edge(KeyEdge::Pressed(key))
    }

    pub fn release(&mut self, key: Key) -> Option<Direction> {
        self.on_edge(KeyEdge::Released(key))
    }

    /// Direction implied by the currently held keys. Up maps to -z.
    pub fn direction(&self) -> Direction {
        let held = |key: Key| if self.held.contains(&key) { 1.0 } else { 0.0 };
        let axis = |pos: Key, neg: Key| held(pos) - held(neg);
        Direction::new(axis(Key::Right, Key::Left), 0.0, axis(Key::Down, Key::Up))
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}
