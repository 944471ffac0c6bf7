//! Flood Reveal
//!
//! Cascading reveal: starting from a hidden cell, reveal the connected
//! region of zero-count cells plus its one-cell-deep numbered border.
//! Mines are only ever revealed by being the direct target - the losing
//! move - and flagged cells are never touched.

use std::collections::{BTreeSet, VecDeque};

use crate::game::board::{Board, CellKind, CellState};

/// Reveal the cell at `(x, y)` and cascade through empty regions.
///
/// Mutates the board in place, keeping `revealed_count` in sync, and
/// returns the set of coordinates revealed by this call.
///
/// - Out-of-range coordinates: no-op, empty result.
/// - Target already revealed or flagged: no-op.
/// - Target is a mine: that one cell is revealed, nothing cascades.
/// - Otherwise: breadth-first expansion. Zero-count cells enqueue all 8
///   neighbors; numbered cells are revealed but not expanded; flagged cells
///   and mines are skipped.
///
/// The result is the full connected component of zero-count cells plus its
/// numbered border, regardless of visitation order.
pub fn flood_reveal(board: &mut Board, x: u32, y: u32) -> BTreeSet<(u32, u32)> {
    let mut revealed = BTreeSet::new();

    let Some(cell) = board.cell(x, y) else {
        return revealed;
    };

    if cell.state == CellState::Revealed || cell.state == CellState::Flagged {
        return revealed;
    }

    if cell.kind == CellKind::Mine {
        board.cell_mut(x, y).expect("checked above").state = CellState::Revealed;
        board.revealed_count += 1;
        revealed.insert((x, y));
        return revealed;
    }

    let mut queue = VecDeque::new();
    queue.push_back((x, y));

    while let Some((cx, cy)) = queue.pop_front() {
        if revealed.contains(&(cx, cy)) {
            continue;
        }

        let cell = *board.cell(cx, cy).expect("queued coordinates are in bounds");
        if cell.state == CellState::Revealed
            || cell.state == CellState::Flagged
            || cell.kind == CellKind::Mine
        {
            continue;
        }

        board.cell_mut(cx, cy).expect("in bounds").state = CellState::Revealed;
        board.revealed_count += 1;
        revealed.insert((cx, cy));

        if cell.kind == CellKind::Empty && cell.adjacent == 0 {
            for (nx, ny) in board.neighbors(cx, cy) {
                if !revealed.contains(&(nx, ny)) {
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    revealed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::generator::generate;

    /// 3x3 board, every cell empty with zero count.
    fn empty_3x3() -> Board {
        Board::blank(3, 3)
    }

    /// Mark `(x, y)` as a number cell with the given count.
    fn set_number(board: &mut Board, x: u32, y: u32, count: u8) {
        let cell = board.cell_mut(x, y).unwrap();
        cell.kind = CellKind::Number;
        cell.adjacent = count;
    }

    /// Mark `(x, y)` as a mine.
    fn set_mine(board: &mut Board, x: u32, y: u32) {
        board.cell_mut(x, y).unwrap().kind = CellKind::Mine;
        board.mine_count += 1;
    }

    #[test]
    fn test_reveal_floods_whole_empty_board() {
        let mut board = empty_3x3();
        let revealed = flood_reveal(&mut board, 1, 1);

        assert_eq!(revealed.len(), 9);
        assert_eq!(board.revealed_count, 9);
        assert!(board.iter_cells().all(|c| c.state == CellState::Revealed));
    }

    #[test]
    fn test_reveal_number_cell_does_not_expand() {
        let mut board = empty_3x3();
        set_number(&mut board, 1, 1, 1);

        let revealed = flood_reveal(&mut board, 1, 1);

        assert_eq!(revealed, BTreeSet::from([(1, 1)]));
        assert_eq!(board.revealed_count, 1);
        assert_eq!(board.cell(0, 0).unwrap().state, CellState::Hidden);
    }

    #[test]
    fn test_numbered_border_revealed_but_not_expanded() {
        // Number at (2, 0), rest empty: flooding from (0, 0) reveals all 9
        // cells, the number included.
        let mut board = empty_3x3();
        set_number(&mut board, 2, 0, 1);

        let revealed = flood_reveal(&mut board, 0, 0);

        assert_eq!(revealed.len(), 9);
        assert!(revealed.contains(&(2, 0)));
        assert_eq!(board.cell(2, 0).unwrap().state, CellState::Revealed);
    }

    #[test]
    fn test_flagged_cell_blocks_reveal() {
        let mut board = empty_3x3();
        board.toggle_flag(1, 0);

        let revealed = flood_reveal(&mut board, 1, 1);

        assert!(!revealed.contains(&(1, 0)));
        assert_eq!(board.cell(1, 0).unwrap().state, CellState::Flagged);
        assert_eq!(revealed.len(), 8);
    }

    #[test]
    fn test_mine_target_reveals_only_itself() {
        let mut board = empty_3x3();
        set_mine(&mut board, 1, 1);

        let revealed = flood_reveal(&mut board, 1, 1);

        assert_eq!(revealed, BTreeSet::from([(1, 1)]));
        assert_eq!(board.revealed_count, 1);
        assert_eq!(board.cell(0, 0).unwrap().state, CellState::Hidden);
    }

    #[test]
    fn test_cascade_never_opens_a_mine() {
        // Mine at (2, 2) surrounded by number cells; flooding the far corner
        // stops at the numbered border.
        let mut board = empty_3x3();
        set_mine(&mut board, 2, 2);
        set_number(&mut board, 1, 1, 1);
        set_number(&mut board, 2, 1, 1);
        set_number(&mut board, 1, 2, 1);

        let revealed = flood_reveal(&mut board, 0, 0);

        assert!(!revealed.contains(&(2, 2)));
        assert_eq!(board.cell(2, 2).unwrap().state, CellState::Hidden);
        assert_eq!(revealed.len(), 8);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut board = empty_3x3();
        let revealed = flood_reveal(&mut board, 5, 5);

        assert!(revealed.is_empty());
        assert_eq!(board.revealed_count, 0);
    }

    #[test]
    fn test_already_revealed_is_noop() {
        let mut board = empty_3x3();
        set_number(&mut board, 1, 1, 1);
        flood_reveal(&mut board, 1, 1);

        let second = flood_reveal(&mut board, 1, 1);
        assert!(second.is_empty());
        assert_eq!(board.revealed_count, 1);
    }

    #[test]
    fn test_flagged_target_is_noop() {
        let mut board = empty_3x3();
        board.toggle_flag(1, 1);

        let revealed = flood_reveal(&mut board, 1, 1);
        assert!(revealed.is_empty());
        assert_eq!(board.cell(1, 1).unwrap().state, CellState::Flagged);
    }

    #[test]
    fn test_generated_board_counts_stay_consistent() {
        let mut board = generate(10, 8, 10, 123, Some((5, 4))).unwrap();
        let revealed = flood_reveal(&mut board, 5, 4);

        assert_eq!(revealed.len() as u32, board.revealed_count);
        let actually_revealed = board
            .iter_cells()
            .filter(|c| c.state == CellState::Revealed)
            .count() as u32;
        assert_eq!(actually_revealed, board.revealed_count);
        // First-click safety means the opening flood trips no mine
        assert!(board
            .iter_cells()
            .filter(|c| c.state == CellState::Revealed)
            .all(|c| c.kind != CellKind::Mine));
    }
}
