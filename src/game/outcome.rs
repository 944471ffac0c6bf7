//! Outcome Evaluation
//!
//! Pure read-only win/loss predicates, evaluated after each reveal.
//! A mine reveal is recorded in `revealed_count` like any other, so the two
//! predicates stay mutually consistent as long as callers check loss before
//! win when the just-revealed cell was a mine.

use crate::game::board::{Board, CellKind, CellState};

/// Whether every non-mine cell has been revealed.
///
/// Flags are irrelevant to the win condition.
pub fn has_won(board: &Board) -> bool {
    board.revealed_count >= board.safe_cells()
}

/// Whether any mine has been revealed.
pub fn has_lost(board: &Board) -> bool {
    board
        .iter_cells()
        .any(|c| c.state == CellState::Revealed && c.kind == CellKind::Mine)
}
