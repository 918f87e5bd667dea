//! Domain events emitted on every accepted state transition.

use crate::move_range::MoveRange;
use crate::outcome::WinnerRecord;
use crate::session::{MoveId, PlayerId, Session, SessionId, now_nanos};
use serde::{Deserialize, Serialize};

/// Default stream topic for game events.
pub const DEFAULT_TOPIC: &str = "tictactoe-game-events";

/// Kind of transition an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A session was created.
    SessionCreated,
    /// A move was accepted.
    TurnPlayed,
}

/// Status attached to a turn event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The game continues.
    Success,
    /// The move ended the game.
    Finished,
}

/// Cell a move targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// Record published to the event stream.
///
/// `valid_moves` and `outcome` are never both present; the constructors
/// are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Unix nanoseconds when the event was built.
    pub timestamp: i64,
    /// Session the event belongs to.
    pub session_id: SessionId,
    /// Player who created the session or made the move.
    pub player_id: PlayerId,
    /// Both players in turn order.
    pub players: Vec<PlayerId>,
    /// Target cell of the move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#move: Option<Coordinates>,
    /// Result of the move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_status: Option<TurnStatus>,
    /// Move id the next submission must echo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_id: Option<MoveId>,
    /// Player to move next, absent once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_player: Option<PlayerId>,
    /// Compressed empty cells while in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_moves: Option<Vec<MoveRange>>,
    /// Result once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<WinnerRecord>,
}

impl GameEvent {
    /// Event for a freshly created session.
    pub fn session_created(session: &Session) -> Self {
        Self {
            kind: EventKind::SessionCreated,
            timestamp: now_nanos(),
            session_id: session.id().clone(),
            player_id: session.players()[0].clone(),
            players: session.players().to_vec(),
            r#move: None,
            turn_status: None,
            move_id: Some(session.expected_move_id()),
            next_player: session.active_player().cloned(),
            valid_moves: Some(session.valid_moves()),
            outcome: None,
        }
    }

    /// Event for a move `player` just made at `(x, y)`; `session` is the
    /// state after the move.
    pub fn turn_played(session: &Session, player: &PlayerId, x: usize, y: usize) -> Self {
        let (turn_status, valid_moves, outcome) = match session.outcome() {
            Some(outcome) => (TurnStatus::Finished, None, Some(outcome.to_record())),
            None => (TurnStatus::Success, Some(session.valid_moves()), None),
        };
        Self {
            kind: EventKind::TurnPlayed,
            timestamp: now_nanos(),
            session_id: session.id().clone(),
            player_id: player.clone(),
            players: session.players().to_vec(),
            r#move: Some(Coordinates { x, y }),
            turn_status: Some(turn_status),
            move_id: Some(session.expected_move_id()),
            next_player: session.active_player().cloned(),
            valid_moves,
            outcome,
        }
    }

    /// Key used to partition the stream.
    pub fn key(&self) -> &str {
        self.session_id.as_str()
    }
}

/// An event addressed to a topic, keyed by session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Stream topic.
    pub topic: String,
    /// Partition key.
    pub key: String,
    /// Payload.
    pub event: GameEvent,
}

impl EventEnvelope {
    /// Wraps `event` for `topic`, keyed by its session id.
    pub fn new(topic: impl Into<String>, event: GameEvent) -> Self {
        Self {
            topic: topic.into(),
            key: event.key().to_string(),
            event,
        }
    }
}
