//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-peer determinism.
//! They are the foundation of the shared-seed board agreement between clients.

pub mod hash;
pub mod rng;

// Re-export core types
pub use hash::{board_hash, BoardDigest, StateHasher};
pub use rng::SeededRng;
