//! Replicated Match
//!
//! Client-side match state, reconstructed by replaying the server's ordered
//! event stream over the shared seed. The board itself never crosses the
//! wire: `Start` fixes the seed, each relayed `Action` mutates the local
//! board through the same reveal/flag rules every peer runs, and `State`
//! resynchronizes wholesale. Peers that apply the same events in the same
//! order hold bit-identical boards - compare [`MatchReplica::board_hash`]
//! to verify.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::hash::{board_hash, BoardDigest};
use crate::game::board::{Board, BoardSpec, CellState};
use crate::game::generator::generate;
use crate::game::outcome::{has_lost, has_won};
use crate::game::reveal::flood_reveal;
use crate::network::protocol::{ActionKind, EndReason, MatchResult, Seat, ServerMessage};

/// Where a replicated match stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaPhase {
    /// Room joined, waiting for the second seat.
    Waiting,
    /// Match running.
    Playing,
    /// Terminal result recorded.
    Finished,
}

/// One peer's view of a duel, derived purely from the event stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchReplica {
    you: Seat,
    spec: BoardSpec,
    players: Vec<String>,
    seed: Option<u64>,
    board: Option<Board>,
    phase: ReplicaPhase,
    current_seat: Option<Seat>,
    turn_ends_at: Option<i64>,
    result: Option<MatchResult>,
}

impl MatchReplica {
    /// Create a replica for the local player's seat.
    ///
    /// Duel boards always use the multiplayer preset.
    pub fn new(you: Seat) -> Self {
        Self {
            you,
            spec: BoardSpec::MULTI,
            players: Vec::new(),
            seed: None,
            board: None,
            phase: ReplicaPhase::Waiting,
            current_seat: None,
            turn_ends_at: None,
            result: None,
        }
    }

    /// The local player's seat.
    pub fn you(&self) -> Seat {
        self.you
    }

    /// Current phase.
    pub fn phase(&self) -> ReplicaPhase {
        self.phase
    }

    /// The replicated board, once `Start` has been applied.
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Seat currently on turn, while playing.
    pub fn current_seat(&self) -> Option<Seat> {
        self.current_seat
    }

    /// Turn deadline from the last `State` resync (unix millis).
    pub fn turn_ends_at(&self) -> Option<i64> {
        self.turn_ends_at
    }

    /// Terminal result, once finished.
    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    /// Whether the local player is on turn.
    pub fn is_my_turn(&self) -> bool {
        self.phase == ReplicaPhase::Playing && self.current_seat == Some(self.you)
    }

    /// Digest of the replicated board, for cross-peer divergence checks.
    pub fn board_hash(&self) -> Option<BoardDigest> {
        self.board.as_ref().map(board_hash)
    }

    /// Apply one event from the server's FIFO stream.
    ///
    /// Events that do not fit the current phase are ignored, mirroring the
    /// protocol's treatment of stale messages as no-ops.
    pub fn apply(&mut self, event: &ServerMessage) {
        match event {
            ServerMessage::RoomCreated { .. } => {}

            ServerMessage::Joined { players, seed, .. } => {
                if self.phase == ReplicaPhase::Waiting {
                    self.players = players.clone();
                    self.seed = Some(*seed);
                }
            }

            ServerMessage::Start { seed } => {
                if self.phase != ReplicaPhase::Waiting {
                    return;
                }
                self.seed = Some(*seed);
                if let Ok(board) = generate(
                    self.spec.width,
                    self.spec.height,
                    self.spec.mine_count,
                    *seed,
                    None,
                ) {
                    self.board = Some(board);
                    self.phase = ReplicaPhase::Playing;
                    self.current_seat = Some(Seat::A);
                }
            }

            ServerMessage::Action { action, x, y, .. } => {
                if self.phase != ReplicaPhase::Playing {
                    return;
                }
                // Only accepted actions are relayed, so the actor is the
                // seat that was on turn.
                let actor = self.current_seat.unwrap_or(Seat::A);
                let Some(board) = self.board.as_mut() else {
                    return;
                };

                match action {
                    ActionKind::Reveal => {
                        flood_reveal(board, *x, *y);
                        if has_lost(board) {
                            self.finish(MatchResult {
                                winner: actor.other(),
                                reason: EndReason::Mine,
                            });
                            return;
                        }
                        if has_won(board) {
                            self.finish(MatchResult {
                                winner: actor,
                                reason: EndReason::AllSafe,
                            });
                            return;
                        }
                    }
                    ActionKind::Flag => {
                        board.toggle_flag(*x, *y);
                    }
                }

                self.current_seat = Some(actor.other());
            }

            ServerMessage::State { revealed, flags, current_seat, turn_ends_at } => {
                if self.phase != ReplicaPhase::Playing {
                    return;
                }
                if let Some(board) = self.board.as_mut() {
                    apply_snapshot(board, revealed, flags);
                }
                self.current_seat = Some(*current_seat);
                self.turn_ends_at = Some(*turn_ends_at);
            }

            ServerMessage::Result { winner, reason } => {
                self.finish(MatchResult { winner: *winner, reason: *reason });
            }
        }
    }

    fn finish(&mut self, result: MatchResult) {
        if self.phase != ReplicaPhase::Finished {
            self.phase = ReplicaPhase::Finished;
            self.result = Some(result);
            self.current_seat = None;
            self.turn_ends_at = None;
        }
    }
}

/// Overwrite cell visibility from a full resync snapshot.
fn apply_snapshot(board: &mut Board, revealed: &BTreeSet<(u32, u32)>, flags: &BTreeSet<(u32, u32)>) {
    let mut revealed_count = 0;
    let mut flagged_count = 0;

    for y in 0..board.height {
        for x in 0..board.width {
            let state = if revealed.contains(&(x, y)) {
                revealed_count += 1;
                CellState::Revealed
            } else if flags.contains(&(x, y)) {
                flagged_count += 1;
                CellState::Flagged
            } else {
                CellState::Hidden
            };
            board.cell_mut(x, y).expect("in bounds").state = state;
        }
    }

    board.revealed_count = revealed_count;
    board.flagged_count = flagged_count;
}
