//! Sync Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON; both unions are closed tagged enums,
//! so peers can replay the ordered event stream without loose typing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// =============================================================================
// SHARED VOCABULARY
// =============================================================================

/// One of the two fixed player slots in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    /// First joiner.
    A,
    /// Second joiner.
    B,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    /// Seat for a 0-based join index (0 = A, 1 = B).
    pub fn from_index(index: usize) -> Option<Seat> {
        match index {
            0 => Some(Seat::A),
            1 => Some(Seat::B),
            _ => None,
        }
    }
}

/// What a player does to a cell on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Reveal the cell (flood-cascades through empty regions).
    Reveal,
    /// Toggle a flag on the cell.
    Flag,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The loser revealed a mine.
    Mine,
    /// The loser let their turn clock expire.
    Timeout,
    /// The winner revealed the last safe cell.
    AllSafe,
}

/// Terminal match outcome. Produced exactly once per room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Winning seat.
    pub winner: Seat,
    /// Why they won.
    pub reason: EndReason,
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a room's event stream.
    Join {
        /// Room code from the HTTP join.
        room_id: String,
        /// Player id issued by the HTTP join.
        player_id: String,
    },

    /// Play a cell on the sender's turn.
    Action {
        /// Player id issued by the HTTP join.
        player_id: String,
        /// Reveal or flag.
        action: ActionKind,
        /// Target column.
        x: u32,
        /// Target row.
        y: u32,
        /// Client wall clock (unix millis), echoed back on relay.
        client_ts: i64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
///
/// Delivery to each subscriber is FIFO in broadcast order; peers replay
/// `Action` relays to reconstruct identical local boards, so reordering
/// would be a correctness bug, not a tolerated variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A room was created.
    RoomCreated {
        /// 4-digit room code.
        room_id: String,
        /// Shared board seed.
        seed: u64,
    },

    /// A player joined the room.
    Joined {
        /// Seated player ids, in seat order.
        players: Vec<String>,
        /// Shared board seed.
        seed: u64,
        /// Seat of the player that just joined.
        you: Seat,
    },

    /// Both seats are filled; generate the board and begin.
    Start {
        /// Shared board seed.
        seed: u64,
    },

    /// Relay of an accepted action, in acceptance order.
    Action {
        /// Acting player id.
        player_id: String,
        /// Reveal or flag.
        action: ActionKind,
        /// Target column.
        x: u32,
        /// Target row.
        y: u32,
        /// Client wall clock echoed from the submission.
        client_ts: i64,
    },

    /// Full resync of replicated state.
    State {
        /// Coordinates of every revealed cell.
        revealed: BTreeSet<(u32, u32)>,
        /// Coordinates of every flagged cell.
        flags: BTreeSet<(u32, u32)>,
        /// Seat currently on turn.
        current_seat: Seat,
        /// Turn deadline (unix millis).
        turn_ends_at: i64,
    },

    /// The match is over. Terminal; nothing follows.
    Result {
        /// Winning seat.
        winner: Seat,
        /// Why they won.
        reason: EndReason,
    },
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_other() {
        assert_eq!(Seat::A.other(), Seat::B);
        assert_eq!(Seat::B.other(), Seat::A);
        assert_eq!(Seat::from_index(0), Some(Seat::A));
        assert_eq!(Seat::from_index(1), Some(Seat::B));
        assert_eq!(Seat::from_index(2), None);
    }

    #[test]
    fn test_client_message_json_roundtrip() {
        let msg = ClientMessage::Action {
            player_id: "p-1".to_string(),
            action: ActionKind::Reveal,
            x: 5,
            y: 4,
            client_ts: 1234567890,
        };

        let json = msg.to_json().unwrap();
        let parsed = ClientMessage::from_json(&json).unwrap();

        if let ClientMessage::Action { action, x, y, client_ts, .. } = parsed {
            assert_eq!(action, ActionKind::Reveal);
            assert_eq!(x, 5);
            assert_eq!(y, 4);
            assert_eq!(client_ts, 1234567890);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_server_message_variants_roundtrip() {
        let messages = vec![
            ServerMessage::RoomCreated { room_id: "1234".to_string(), seed: 42 },
            ServerMessage::Joined {
                players: vec!["p-1".to_string(), "p-2".to_string()],
                seed: 42,
                you: Seat::B,
            },
            ServerMessage::Start { seed: 42 },
            ServerMessage::Action {
                player_id: "p-1".to_string(),
                action: ActionKind::Flag,
                x: 0,
                y: 0,
                client_ts: 7,
            },
            ServerMessage::State {
                revealed: BTreeSet::from([(0, 0), (1, 0)]),
                flags: BTreeSet::from([(2, 2)]),
                current_seat: Seat::B,
                turn_ends_at: 1_700_000_000_000,
            },
            ServerMessage::Result { winner: Seat::A, reason: EndReason::AllSafe },
        ];

        for msg in messages {
            let json = msg.to_json().unwrap();
            let _parsed = ServerMessage::from_json(&json).unwrap();
        }
    }

    #[test]
    fn test_wire_tags() {
        let json = ServerMessage::Start { seed: 9 }.to_json().unwrap();
        assert!(json.contains("\"type\":\"start\""));

        let json = ServerMessage::Result { winner: Seat::B, reason: EndReason::AllSafe }
            .to_json()
            .unwrap();
        assert!(json.contains("allSafe"));
        assert!(json.contains("\"winner\":\"B\""));

        let json = ClientMessage::Action {
            player_id: "p".to_string(),
            action: ActionKind::Flag,
            x: 1,
            y: 2,
            client_ts: 0,
        }
        .to_json()
        .unwrap();
        assert!(json.contains("\"action\":\"flag\""));
    }

    #[test]
    fn test_rejects_unknown_tag() {
        assert!(ClientMessage::from_json("{\"type\":\"warp\",\"x\":1}").is_err());
    }
}
