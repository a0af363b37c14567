//! Worldsync - authoritative position sync over WebSocket
//!
//! The server side assigns each connection an identity, buffers the latest
//! direction per identity, integrates motion on a fixed timer, and broadcasts
//! full world snapshots on another. The client side mirrors those snapshots
//! into local entities and turns key edges into deduplicated input reports.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
