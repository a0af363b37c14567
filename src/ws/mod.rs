//! WebSocket transport: wire protocol, frame codec and connection handler

pub mod codec;
pub mod handler;
pub mod protocol;
