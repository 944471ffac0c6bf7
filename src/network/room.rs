//! Room Lifecycle & Turn Synchronization
//!
//! Server-side authority for room creation, seat assignment, turn order,
//! turn deadlines, and the terminal match result. The server keeps its own
//! replica board per room - generated from the shared seed like any peer -
//! to validate moves and settle outcomes, but never ships it over the wire.
//!
//! Concurrency model: every room lives behind its own `RwLock`, so all
//! mutation of one room is serialized through the write lock while distinct
//! rooms proceed in parallel. The turn timer is a spawned task that re-locks
//! the room and checks a turn generation counter before acting, so a timeout
//! can never race a just-accepted action.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::board::{Board, BoardSpec, CellState};
use crate::game::generator::{generate, GenerateError};
use crate::game::outcome::{has_lost, has_won};
use crate::game::reveal::flood_reveal;
use crate::network::protocol::{ActionKind, EndReason, MatchResult, Seat, ServerMessage};
use crate::{ROOM_MAX_IDLE_SECS, ROOM_SWEEP_INTERVAL_SECS, TURN_WINDOW_SECS};

/// 4-digit decimal room code.
pub type RoomId = String;

/// Room lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// 0 or 1 seats filled.
    Waiting,
    /// Both seats filled, turn timer armed.
    Playing,
    /// Terminal result recorded. No further mutation.
    Finished,
}

/// Room manager configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Time budget per turn.
    pub turn_window: Duration,
    /// Cadence of the idle-room sweep.
    pub sweep_interval: Duration,
    /// Idle age (since last activity) after which a room is evicted.
    pub max_idle: Duration,
    /// Board preset shared by both peers.
    pub board: BoardSpec,
    /// Attempts to mint an unused room code before giving up.
    pub code_retry_limit: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            turn_window: Duration::from_secs(TURN_WINDOW_SECS),
            sweep_interval: Duration::from_secs(ROOM_SWEEP_INTERVAL_SECS),
            max_idle: Duration::from_secs(ROOM_MAX_IDLE_SECS),
            board: BoardSpec::MULTI,
            code_retry_limit: 16,
        }
    }
}

/// Room manager errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    /// Unknown room id.
    #[error("room not found")]
    NotFound,

    /// Both seats are already occupied.
    #[error("room is full")]
    RoomFull,

    /// Could not mint an unused room code within the retry budget.
    #[error("room codes exhausted")]
    CodesExhausted,

    /// Board generation failed.
    #[error("board generation failed: {0}")]
    Generate(#[from] GenerateError),
}

/// Result of creating a room.
#[derive(Debug, Clone)]
pub struct CreatedRoom {
    /// Minted 4-digit code.
    pub room_id: RoomId,
    /// Shared board seed.
    pub seed: u64,
}

/// Result of joining a room.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    /// Shared board seed.
    pub seed: u64,
    /// Seat assigned to the joiner.
    pub seat: Seat,
    /// Player id minted for the joiner.
    pub player_id: String,
    /// All seated player ids, in seat order.
    pub players: Vec<String>,
}

/// Introspection snapshot of a room.
#[derive(Debug, Clone)]
pub struct RoomStatus {
    /// Room code.
    pub id: RoomId,
    /// Shared board seed.
    pub seed: u64,
    /// Seated player ids, in seat order.
    pub players: Vec<String>,
    /// Creation time (unix millis).
    pub created_at: i64,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Seat on turn, while playing.
    pub current_seat: Option<Seat>,
    /// Turn deadline (unix millis), while playing.
    pub turn_deadline: Option<i64>,
    /// Terminal result, once finished.
    pub result: Option<MatchResult>,
}

/// Whether a submitted action was applied.
///
/// Invalid moves (wrong phase, wrong seat, unplayable cell) are rejected
/// silently - no state change, no broadcast - so races between a client's
/// view and the server's turn state stay harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Applied and broadcast.
    Accepted,
    /// Silently dropped.
    Rejected,
}

/// A per-subscriber FIFO event stream for one room.
///
/// Dropping the subscription (or calling [`RoomManager::unsubscribe`])
/// deregisters the subscriber; a dead stream is also pruned on the next
/// broadcast.
pub struct RoomSubscription {
    id: u64,
    room_id: RoomId,
    /// Events in broadcast order.
    pub events: mpsc::UnboundedReceiver<ServerMessage>,
}

impl RoomSubscription {
    /// Subscriber id, for deregistration.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Room this subscription listens to.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Receive the next event, FIFO.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.events.recv().await
    }
}

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

struct Room {
    id: RoomId,
    seed: u64,
    spec: BoardSpec,
    players: Vec<String>,
    phase: RoomPhase,
    board: Option<Board>,
    current_seat: Option<Seat>,
    turn_deadline: Option<DateTime<Utc>>,
    /// Bumped whenever the pending timer is invalidated; the timer task
    /// only acts if its generation is still current.
    turn_generation: u64,
    timer: Option<JoinHandle<()>>,
    result: Option<MatchResult>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    subscribers: Vec<Subscriber>,
}

impl Room {
    fn new(id: RoomId, seed: u64, spec: BoardSpec) -> Self {
        let now = Utc::now();
        Self {
            id,
            seed,
            spec,
            players: Vec::new(),
            phase: RoomPhase::Waiting,
            board: None,
            current_seat: None,
            turn_deadline: None,
            turn_generation: 0,
            timer: None,
            result: None,
            created_at: now,
            last_activity: now,
            subscribers: Vec::new(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Send an event to every live subscriber, pruning dead ones.
    fn broadcast(&mut self, message: ServerMessage) {
        self.subscribers.retain(|s| s.sender.send(message.clone()).is_ok());
    }

    fn seat_of(&self, player_id: &str) -> Option<Seat> {
        self.players
            .iter()
            .position(|p| p == player_id)
            .and_then(Seat::from_index)
    }

    fn cancel_timer(&mut self) {
        self.turn_generation += 1;
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }

    /// Record the terminal result and broadcast it. Idempotent guard is the
    /// caller's phase check; after this the room never mutates again.
    fn finish(&mut self, result: MatchResult) {
        self.cancel_timer();
        self.phase = RoomPhase::Finished;
        self.result = Some(result);
        self.current_seat = None;
        self.turn_deadline = None;
        self.touch();
        info!(room = %self.id, winner = ?result.winner, reason = ?result.reason, "match finished");
        self.broadcast(ServerMessage::Result {
            winner: result.winner,
            reason: result.reason,
        });
    }

    /// Full resync snapshot of the replicated state.
    fn state_message(&self) -> Option<ServerMessage> {
        let board = self.board.as_ref()?;
        let current_seat = self.current_seat?;
        let turn_ends_at = self.turn_deadline?.timestamp_millis();

        let mut revealed = BTreeSet::new();
        let mut flags = BTreeSet::new();
        for cell in board.iter_cells() {
            match cell.state {
                CellState::Revealed => {
                    revealed.insert((cell.x, cell.y));
                }
                CellState::Flagged => {
                    flags.insert((cell.x, cell.y));
                }
                CellState::Hidden => {}
            }
        }

        Some(ServerMessage::State { revealed, flags, current_seat, turn_ends_at })
    }

    fn status(&self) -> RoomStatus {
        RoomStatus {
            id: self.id.clone(),
            seed: self.seed,
            players: self.players.clone(),
            created_at: self.created_at.timestamp_millis(),
            phase: self.phase,
            current_seat: self.current_seat,
            turn_deadline: self.turn_deadline.map(|d| d.timestamp_millis()),
            result: self.result,
        }
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

/// Shared, concurrently-accessed room authority.
///
/// Constructed explicitly at startup and stopped with the process; owns its
/// room map and (via [`RoomManager::spawn_sweeper`]) its cleanup scheduler.
/// No module-level state.
pub struct RoomManager {
    config: RoomConfig,
    rooms: RwLock<BTreeMap<RoomId, Arc<RwLock<Room>>>>,
    next_subscriber_id: AtomicU64,
}

impl RoomManager {
    /// Create a manager with the given configuration.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(BTreeMap::new()),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// Create a room: mint a 4-digit code and a board seed.
    ///
    /// The 10,000-code space makes collisions likely under load, so minting
    /// retries a bounded number of times; exhaustion surfaces as an error
    /// with no partial room.
    pub async fn create_room(&self) -> Result<CreatedRoom, RoomError> {
        let mut rooms = self.rooms.write().await;

        for _ in 0..self.config.code_retry_limit {
            let (room_id, seed) = {
                let mut rng = rand::thread_rng();
                (rng.gen_range(1000..10_000u32).to_string(), rng.gen_range(0..1_000_000u64))
            };

            if rooms.contains_key(&room_id) {
                continue;
            }

            let room = Room::new(room_id.clone(), seed, self.config.board);
            rooms.insert(room_id.clone(), Arc::new(RwLock::new(room)));
            info!(room = %room_id, seed, "created room");
            return Ok(CreatedRoom { room_id, seed });
        }

        warn!("room code space exhausted after {} attempts", self.config.code_retry_limit);
        Err(RoomError::CodesExhausted)
    }

    async fn room(&self, room_id: &str) -> Result<Arc<RwLock<Room>>, RoomError> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned().ok_or(RoomError::NotFound)
    }

    /// Join a room: assign the next open seat (A first, then B).
    ///
    /// Filling seat B transitions the room to `Playing`: the server deals
    /// its own board from the seed, arms the turn timer for seat A, and
    /// broadcasts `Start` after the `Joined` event.
    pub async fn join_room(&self, room_id: &str) -> Result<JoinInfo, RoomError> {
        let room_arc = self.room(room_id).await?;
        let mut room = room_arc.write().await;

        if room.players.len() >= 2 {
            return Err(RoomError::RoomFull);
        }

        // Deal the server's replica board up front when this join fills
        // seat B, so a generation failure leaves the room untouched.
        let board = if room.players.len() == 1 {
            let spec = room.spec;
            Some(generate(spec.width, spec.height, spec.mine_count, room.seed, None)?)
        } else {
            None
        };

        let player_id = uuid::Uuid::new_v4().to_string();
        room.players.push(player_id.clone());
        let seat = Seat::from_index(room.players.len() - 1).expect("at most two seats");
        room.touch();

        info!(room = %room_id, seat = ?seat, "player joined");
        let joined_players = room.players.clone();
        let joined_seed = room.seed;
        room.broadcast(ServerMessage::Joined {
            players: joined_players,
            seed: joined_seed,
            you: seat,
        });

        if let Some(board) = board {
            room.board = Some(board);
            room.phase = RoomPhase::Playing;
            room.current_seat = Some(Seat::A);
            self.arm_turn_timer(&room_arc, &mut room);

            let seed = room.seed;
            info!(room = %room_id, seed, "both seats filled, match starting");
            room.broadcast(ServerMessage::Start { seed });
        }

        Ok(JoinInfo {
            seed: room.seed,
            seat,
            player_id,
            players: room.players.clone(),
        })
    }

    /// Submit an action for a seat. Invalid moves are silently rejected.
    pub async fn submit_action(
        &self,
        room_id: &str,
        seat: Seat,
        action: ActionKind,
        x: u32,
        y: u32,
        client_ts: i64,
    ) -> Result<SubmitOutcome, RoomError> {
        let room_arc = self.room(room_id).await?;
        let mut room = room_arc.write().await;
        Ok(self.apply_action(&room_arc, &mut room, seat, action, x, y, client_ts))
    }

    /// Submit an action for a player id (resolved to its seat in-lock).
    pub async fn submit_player_action(
        &self,
        room_id: &str,
        player_id: &str,
        action: ActionKind,
        x: u32,
        y: u32,
        client_ts: i64,
    ) -> Result<SubmitOutcome, RoomError> {
        let room_arc = self.room(room_id).await?;
        let mut room = room_arc.write().await;

        let Some(seat) = room.seat_of(player_id) else {
            debug!(room = %room_id, "action from unseated player rejected");
            return Ok(SubmitOutcome::Rejected);
        };
        Ok(self.apply_action(&room_arc, &mut room, seat, action, x, y, client_ts))
    }

    fn apply_action(
        &self,
        room_arc: &Arc<RwLock<Room>>,
        room: &mut Room,
        seat: Seat,
        action: ActionKind,
        x: u32,
        y: u32,
        client_ts: i64,
    ) -> SubmitOutcome {
        if room.phase != RoomPhase::Playing || room.current_seat != Some(seat) {
            debug!(room = %room.id, seat = ?seat, "action out of turn rejected");
            return SubmitOutcome::Rejected;
        }

        let playable = room.board.as_ref().and_then(|b| b.cell(x, y)).map(|cell| match action {
            ActionKind::Reveal => cell.state == CellState::Hidden,
            ActionKind::Flag => cell.state != CellState::Revealed,
        });
        if playable != Some(true) {
            debug!(room = %room.id, x, y, "unplayable cell rejected");
            return SubmitOutcome::Rejected;
        }

        // Cancel the pending timeout before any effect is applied, so the
        // terminal transition can only fire once.
        room.cancel_timer();
        room.touch();

        let board = room.board.as_mut().expect("checked above");
        match action {
            ActionKind::Reveal => {
                flood_reveal(board, x, y);
            }
            ActionKind::Flag => {
                board.toggle_flag(x, y);
            }
        }

        let player_id = room.players[seat as usize].clone();
        room.broadcast(ServerMessage::Action { player_id, action, x, y, client_ts });

        let board = room.board.as_ref().expect("still present");
        if has_lost(board) {
            room.finish(MatchResult { winner: seat.other(), reason: EndReason::Mine });
        } else if has_won(board) {
            room.finish(MatchResult { winner: seat, reason: EndReason::AllSafe });
        } else {
            room.current_seat = Some(seat.other());
            self.arm_turn_timer(room_arc, room);
            if let Some(state) = room.state_message() {
                room.broadcast(state);
            }
        }

        SubmitOutcome::Accepted
    }

    /// Arm (or re-arm) the turn timer for the seat currently on turn.
    ///
    /// The previous timer is invalidated by the generation bump and aborted;
    /// the new task re-locks the room when it fires and forfeits the match
    /// against the seat that was on turn, unless the generation moved on.
    fn arm_turn_timer(&self, room_arc: &Arc<RwLock<Room>>, room: &mut Room) {
        room.cancel_timer();
        let generation = room.turn_generation;
        let window = self.config.turn_window;
        room.turn_deadline =
            Some(Utc::now() + chrono::Duration::milliseconds(window.as_millis() as i64));

        let arc = Arc::clone(room_arc);
        room.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut room = arc.write().await;
            if room.phase != RoomPhase::Playing || room.turn_generation != generation {
                return;
            }
            let idle_seat = room.current_seat.unwrap_or(Seat::A);
            debug!(room = %room.id, seat = ?idle_seat, "turn clock expired");
            room.finish(MatchResult { winner: idle_seat.other(), reason: EndReason::Timeout });
        }));
    }

    /// Subscribe to a room's event stream.
    pub async fn subscribe(&self, room_id: &str) -> Result<RoomSubscription, RoomError> {
        let room_arc = self.room(room_id).await?;
        let mut room = room_arc.write().await;

        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, events) = mpsc::unbounded_channel();
        room.subscribers.push(Subscriber { id, sender });
        room.touch();

        Ok(RoomSubscription { id, room_id: room_id.to_string(), events })
    }

    /// Deregister a subscriber.
    pub async fn unsubscribe(&self, room_id: &str, subscriber_id: u64) {
        if let Ok(room_arc) = self.room(room_id).await {
            let mut room = room_arc.write().await;
            room.subscribers.retain(|s| s.id != subscriber_id);
        }
    }

    /// Introspect a room.
    pub async fn room_status(&self, room_id: &str) -> Result<RoomStatus, RoomError> {
        let room_arc = self.room(room_id).await?;
        let room = room_arc.read().await;
        Ok(room.status())
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Evict rooms idle longer than the configured limit.
    ///
    /// Keyed off last-activity time, not creation time: a room in a live
    /// match has recent activity and is never evicted mid-game (and the
    /// 10-second turn clock finishes stalled matches long before the idle
    /// limit anyway).
    pub async fn cleanup(&self) {
        let max_idle =
            chrono::Duration::milliseconds(self.config.max_idle.as_millis() as i64);
        let now = Utc::now();

        let mut rooms = self.rooms.write().await;
        let mut evict = Vec::new();
        for (id, room_arc) in rooms.iter() {
            let room = room_arc.read().await;
            if now - room.last_activity > max_idle {
                evict.push(id.clone());
            }
        }

        for id in evict {
            rooms.remove(&id);
            info!(room = %id, "evicted idle room");
        }
    }

    /// Spawn the periodic idle-room sweep. Abort the returned handle to
    /// stop it at shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.config.sweep_interval);
            // The first tick completes immediately; skip it so a fresh
            // process does not sweep at startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                manager.cleanup().await;
            }
        })
    }
}
