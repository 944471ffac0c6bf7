//! # MineDuel Server
//!
//! Deterministic minesweeper core plus the turn-based duel server built on it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MINEDUEL SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded LCG PRNG + Fisher-Yates shuffle    │
//! │  └── hash.rs     - Board state hashing for verification      │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── board.rs    - Cell/Board data model, flag toggling      │
//! │  ├── generator.rs- Mine placement with first-click safety    │
//! │  ├── reveal.rs   - Cascading flood reveal                    │
//! │  ├── outcome.rs  - Win/loss predicates                       │
//! │  ├── solo.rs     - Solo game state machine                   │
//! │  └── replica.rs  - Event-sourced client match replica        │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - Sync message types                        │
//! │  ├── room.rs     - Room lifecycle, turns, event bus          │
//! │  ├── server.rs   - WebSocket sync server                     │
//! │  └── http.rs     - HTTP room API                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No wall-clock or I/O dependencies
//! - `BTreeSet`/row-major iteration instead of hashed collections
//! - All gameplay randomness from the seeded LCG in `core::rng`
//!
//! Two peers holding the same seed and applying the same ordered action log
//! derive bit-identical boards. The server never ships the board over the
//! wire; it is authoritative only for turn order and the terminal result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::hash::{board_hash, BoardDigest};
pub use crate::core::rng::SeededRng;
pub use crate::game::board::{Board, BoardSpec, Cell, CellKind, CellState};
pub use crate::game::generator::generate;
pub use crate::game::outcome::{has_lost, has_won};
pub use crate::game::reveal::flood_reveal;
pub use crate::network::protocol::{ActionKind, EndReason, MatchResult, Seat};
pub use crate::network::room::{RoomConfig, RoomManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Time budget per turn in a duel (seconds)
pub const TURN_WINDOW_SECS: u64 = 10;

/// Cadence of the idle-room sweep (seconds)
pub const ROOM_SWEEP_INTERVAL_SECS: u64 = 600;

/// Idle age after which a room is evicted by the sweep (seconds)
pub const ROOM_MAX_IDLE_SECS: u64 = 3600;
