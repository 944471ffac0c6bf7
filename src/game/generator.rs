//! Board Generation
//!
//! Deterministic mine placement from a shared seed, with an optional
//! first-click safety guarantee: when the opening move is known up front,
//! the clicked cell and its up-to-8 neighbors are excluded from the
//! candidate set *before* any mine is placed, so the opening flood can
//! never trip a mine.

use crate::core::rng::SeededRng;
use crate::game::board::{Board, CellKind};

/// Board generation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerateError {
    /// The requested mine count does not fit the grid (or the grid is empty).
    #[error("invalid board config: {mine_count} mines on a {width}x{height} grid")]
    InvalidConfig {
        /// Requested columns.
        width: u32,
        /// Requested rows.
        height: u32,
        /// Requested mines.
        mine_count: u32,
    },
}

/// Whether `(x, y)` is inside the 3x3 safety box around `first_click`.
fn in_safety_box(x: u32, y: u32, first_click: (u32, u32)) -> bool {
    let (fx, fy) = first_click;
    (x as i64 - fx as i64).abs() <= 1 && (y as i64 - fy as i64).abs() <= 1
}

/// Generate a board.
///
/// 1. Allocate a `width*height` grid, all cells empty/hidden.
/// 2. Enumerate candidate positions row-major; when `first_click` is given,
///    exclude it and its neighbors.
/// 3. Fisher-Yates shuffle the candidates with [`SeededRng`] and take the
///    first `mine_count` as mine positions.
/// 4. Compute every non-mine cell's adjacency count over the 8-connected
///    ring; `adjacent > 0` makes it a number cell, otherwise it stays empty.
///
/// Exactly `mine_count` mines are placed, or the call fails fast with
/// [`GenerateError::InvalidConfig`] and no board is built: that covers
/// `mine_count >= width*height`, an empty grid, and a first-click exclusion
/// that leaves fewer candidates than mines.
pub fn generate(
    width: u32,
    height: u32,
    mine_count: u32,
    seed: u64,
    first_click: Option<(u32, u32)>,
) -> Result<Board, GenerateError> {
    let invalid = GenerateError::InvalidConfig { width, height, mine_count };

    if width == 0 || height == 0 || mine_count >= width * height {
        return Err(invalid);
    }

    let mut board = Board::blank(width, height);

    // Candidate enumeration order is part of the determinism contract:
    // row-major, then one shared-seed shuffle.
    let mut candidates: Vec<(u32, u32)> = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            match first_click {
                Some(fc) if in_safety_box(x, y, fc) => continue,
                _ => candidates.push((x, y)),
            }
        }
    }

    if (candidates.len() as u32) < mine_count {
        return Err(invalid);
    }

    let mut rng = SeededRng::new(seed);
    rng.shuffle(&mut candidates);

    for &(x, y) in candidates.iter().take(mine_count as usize) {
        board.cell_mut(x, y).expect("candidate in bounds").kind = CellKind::Mine;
    }
    board.mine_count = mine_count;

    for y in 0..height {
        for x in 0..width {
            if board.cell(x, y).map(|c| c.kind) == Some(CellKind::Mine) {
                continue;
            }
            let count = board.adjacent_mines(x, y);
            let cell = board.cell_mut(x, y).expect("in bounds");
            cell.adjacent = count;
            cell.kind = if count > 0 { CellKind::Number } else { CellKind::Empty };
        }
    }

    Ok(board)
}
