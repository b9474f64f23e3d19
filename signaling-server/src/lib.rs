//! Presence, push-to-talk state and WebRTC signaling relay for the in-game
//! voice overlay.
//!
//! Clients hold a WebSocket to the hub, claim a unique gamertag, and from
//! then on receive presence changes, push-to-talk updates and game state
//! pushes. Offer/answer/ICE frames are relayed to a single peer addressed by
//! gamertag; voice itself never passes through the hub.

pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
pub mod verify;

pub use config::Config;
pub use error::{JoinError, LookupError, ServerError};
pub use server::{run, serve};
pub use state::AppState;
