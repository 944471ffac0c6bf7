//! Board State Hashing
//!
//! Deterministic digests of board state for:
//! - Divergence detection between replicated peers
//! - Replay validation in tests
//!
//! Digests are diagnostic only; no gameplay decision depends on them.

use sha2::{Digest, Sha256};

use crate::game::board::Board;

/// Hash output type (256 bits / 32 bytes)
pub type BoardDigest = [u8; 32];

/// Deterministic hasher for game state.
///
/// Wraps SHA-256 with little-endian integer helpers.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for board state.
    pub fn for_board() -> Self {
        Self::new(b"MINEDUEL_BOARD_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> BoardDigest {
        self.hasher.finalize().into()
    }
}

/// Compute the digest of a board.
///
/// Covers dimensions, counters, and every cell in row-major order, so two
/// peers that generated from the same seed and replayed the same action log
/// produce equal digests.
pub fn board_hash(board: &Board) -> BoardDigest {
    let mut hasher = StateHasher::for_board();

    hasher.update_u32(board.width);
    hasher.update_u32(board.height);
    hasher.update_u32(board.mine_count);
    hasher.update_u32(board.revealed_count);
    hasher.update_u32(board.flagged_count);

    for cell in board.iter_cells() {
        hasher.update_u8(cell.kind as u8);
        hasher.update_u8(cell.state as u8);
        hasher.update_u8(cell.adjacent);
    }

    hasher.finalize()
}
