//! Viewer-side building blocks for lockstep rooms: the wire protocol, the
//! sync engine that keeps a local player convergent with the room's
//! authoritative playback state, and the WebSocket session that carries it.
//!
//! The actual rendering backend is out of scope; anything that can
//! play/pause/seek implements [`Player`] and the engine drives it.

pub mod engine;
pub mod player;
pub mod protocol;
pub mod session;

pub use engine::SyncEngine;
pub use player::Player;
pub use session::{generate_room_code, SyncSession};
