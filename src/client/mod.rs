//! Client-side synchronization: input sampling, snapshot mirroring and the
//! connection state machine tying them together

pub mod input;
pub mod mirror;
pub mod session;

pub use input::{InputSampler, Key, KeyEdge};
pub use mirror::{ClientMirror, EntityHandle, Placeable, ReconcileReport};
pub use session::{ClientSession, ClientState, Handled};
