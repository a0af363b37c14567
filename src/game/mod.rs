//! Server-side simulation modules

pub mod physics;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod world;

pub use registry::{ConnectionRegistry, ConnectionState};
pub use session::{Joined, WorldHandle, WorldSession};
pub use world::{InputBuffer, World, WorldError, WorldState};
