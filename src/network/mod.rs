//! Network Layer
//!
//! HTTP room API and WebSocket event streaming.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod http;
pub mod protocol;
pub mod room;
pub mod server;

pub use http::{router, HttpConfig};
pub use protocol::{ActionKind, ClientMessage, EndReason, MatchResult, Seat, ServerMessage};
pub use room::{RoomConfig, RoomError, RoomManager, RoomSubscription, SubmitOutcome};
pub use server::{SyncServer, SyncServerConfig, SyncServerError};
