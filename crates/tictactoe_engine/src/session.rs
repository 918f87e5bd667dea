//! A single two-player game and its turn state machine.

use crate::error::PlaceError;
use crate::grid::{Grid, Mark};
use crate::move_range::{MoveRange, compress};
use crate::outcome::{Direction, Outcome, WinningLine};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Unique identifier for a session.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Allocates a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a player, opaque to the engine.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Token a client echoes back to prove it acted on the latest state.
///
/// It advances with every accepted move. It is not secret and not
/// collision resistant; it only rejects stale or duplicated submissions.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct MoveId(u64);

impl MoveId {
    /// Wraps a raw value received from a client.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value for the wire.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Unix time in nanoseconds.
pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// One game between two players.
///
/// Once `outcome` is set the session is finished and nothing else changes.
/// Serialize-only: a session is built by [`Session::new`] and changed by
/// [`Session::place_mark`], never read back from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct Session {
    /// Session id, fixed at creation.
    id: SessionId,
    /// The grid, owned by this session.
    grid: Grid,
    /// Turn order. The first player holds [`Mark::First`].
    players: [PlayerId; 2],
    /// Index into `players` of whoever moves next.
    #[getter(skip)]
    current_player_index: usize,
    /// Accepted moves so far.
    #[getter(skip)]
    turn_count: u32,
    /// Unix nanoseconds of the last accepted move, 0 before the first.
    #[getter(skip)]
    last_move_timestamp: i64,
    /// Terminal result, absent while in progress.
    outcome: Option<Outcome>,
}

impl Session {
    /// Creates a session with a fresh id. `players[0]` moves first.
    #[instrument(fields(first = %players[0], second = %players[1]))]
    pub fn new(players: [PlayerId; 2]) -> Self {
        Self::with_id(SessionId::generate(), players)
    }

    /// Creates a session under a caller-chosen id.
    #[instrument(fields(session_id = %id))]
    pub fn with_id(id: SessionId, players: [PlayerId; 2]) -> Self {
        info!("Creating new game session");
        Self {
            id,
            grid: Grid::new(),
            players,
            current_player_index: 0,
            turn_count: 0,
            last_move_timestamp: 0,
            outcome: None,
        }
    }

    /// Player whose turn it is, or `None` once the game is over.
    pub fn active_player(&self) -> Option<&PlayerId> {
        if self.is_finished() {
            return None;
        }
        Some(self.current_player())
    }

    /// Player at the current turn index, whether or not the game is over.
    ///
    /// The index advances on the final move too; use
    /// [`Session::active_player`] to ask who may move.
    pub fn current_player(&self) -> &PlayerId {
        &self.players[self.current_player_index]
    }

    /// Mark assigned to `player`, if they belong to this session.
    pub fn mark_of(&self, player: &PlayerId) -> Option<Mark> {
        match self.players.iter().position(|p| p == player) {
            Some(0) => Some(Mark::First),
            Some(_) => Some(Mark::Second),
            None => None,
        }
    }

    /// Number of accepted moves.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Unix nanoseconds of the last accepted move.
    pub fn last_move_timestamp(&self) -> i64 {
        self.last_move_timestamp
    }

    /// Returns true once an outcome has been recorded.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Move id the next submission must carry.
    ///
    /// Derived from the turn counter, so it changes with every accepted move
    /// and never repeats within a session.
    pub fn expected_move_id(&self) -> MoveId {
        MoveId(u64::from(self.turn_count))
    }

    /// Compressed list of the empty cells.
    pub fn valid_moves(&self) -> Vec<MoveRange> {
        compress(&self.grid)
    }

    /// Places the mark of `player` at `(x, y)`.
    ///
    /// Checks run in a fixed order: active player, move id, then cell. A
    /// rejected move leaves the session untouched.
    #[instrument(skip(self), fields(session_id = %self.id, turn = self.turn_count))]
    pub fn place_mark(
        &mut self,
        player: &PlayerId,
        move_id: MoveId,
        x: usize,
        y: usize,
    ) -> Result<(), PlaceError> {
        if self.active_player() != Some(player) {
            debug!(active = ?self.active_player(), "Player tried to move out of turn");
            return Err(PlaceError::NotActivePlayer);
        }
        if move_id != self.expected_move_id() {
            debug!(expected = %self.expected_move_id(), "Stale move id");
            return Err(PlaceError::InvalidMoveId);
        }
        if !Grid::coordinates_valid(x, y) || !self.grid.is_empty(x, y) {
            debug!("Cell unavailable");
            return Err(PlaceError::InvalidMove);
        }
        let mark = self.mark_of(player).ok_or(PlaceError::NotActivePlayer)?;

        self.grid.set(x, y, mark);
        self.outcome = self.evaluate(player, x, y);
        self.current_player_index = (self.current_player_index + 1) % self.players.len();
        self.turn_count += 1;
        self.last_move_timestamp = now_nanos();

        info!(
            player = %player,
            outcome = ?self.outcome,
            "Move completed successfully"
        );
        Ok(())
    }

    /// Outcome after `player` marked `(x, y)`.
    ///
    /// Row, column, up-diagonal, down-diagonal, then full grid; the first
    /// match is the only one recorded.
    fn evaluate(&self, player: &PlayerId, x: usize, y: usize) -> Option<Outcome> {
        let line = if self.grid.row_filled(y) {
            Some(WinningLine::new(Direction::Row, y))
        } else if self.grid.column_filled(x) {
            Some(WinningLine::new(Direction::Column, x))
        } else if self.grid.diagonal_up_filled() {
            Some(WinningLine::new(Direction::DiagUp, 0))
        } else if self.grid.diagonal_down_filled() {
            Some(WinningLine::new(Direction::DiagDown, 0))
        } else {
            None
        };

        match line {
            Some(line) => Some(Outcome::Win {
                player: player.clone(),
                lines: vec![line],
            }),
            None if self.grid.is_full() => Some(Outcome::Draw),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> PlayerId {
        PlayerId::from("alice")
    }

    fn bob() -> PlayerId {
        PlayerId::from("bob")
    }

    fn session() -> Session {
        Session::with_id(SessionId::from("s1"), [alice(), bob()])
    }

    fn play(session: &mut Session, moves: &[(usize, usize)]) {
        for &(x, y) in moves {
            let player = session.active_player().cloned().expect("game still running");
            let id = session.expected_move_id();
            session
                .place_mark(&player, id, x, y)
                .expect("legal move");
        }
    }

    #[test]
    fn test_new_session() {
        let s = session();
        assert_eq!(s.active_player(), Some(&alice()));
        assert_eq!(s.turn_count(), 0);
        assert_eq!(s.last_move_timestamp(), 0);
        assert_eq!(s.expected_move_id(), MoveId::new(0));
        assert_eq!(s.mark_of(&alice()), Some(Mark::First));
        assert_eq!(s.mark_of(&bob()), Some(Mark::Second));
        assert_eq!(s.mark_of(&PlayerId::from("carol")), None);
        assert!(s.outcome().is_none());
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = Session::new([alice(), bob()]);
        let b = Session::new([alice(), bob()]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_accepted_move_advances_turn() {
        let mut s = session();
        s.place_mark(&alice(), MoveId::new(0), 0, 0).expect("legal");
        assert_eq!(s.grid().get(0, 0), Mark::First);
        assert_eq!(s.active_player(), Some(&bob()));
        assert_eq!(s.turn_count(), 1);
        assert!(s.last_move_timestamp() > 0);
        assert_eq!(s.expected_move_id(), MoveId::new(1));
    }

    #[test]
    fn test_wrong_player_rejected() {
        let mut s = session();
        let before = s.clone();
        let result = s.place_mark(&bob(), MoveId::new(0), 0, 0);
        assert_eq!(result, Err(PlaceError::NotActivePlayer));
        assert_eq!(s, before);
    }

    #[test]
    fn test_stranger_rejected() {
        let mut s = session();
        let result = s.place_mark(&PlayerId::from("mallory"), MoveId::new(0), 0, 0);
        assert_eq!(result, Err(PlaceError::NotActivePlayer));
    }

    #[test]
    fn test_stale_move_id_rejected() {
        let mut s = session();
        play(&mut s, &[(0, 0)]);
        let before = s.clone();
        let result = s.place_mark(&bob(), MoveId::new(0), 1, 1);
        assert_eq!(result, Err(PlaceError::InvalidMoveId));
        assert_eq!(s, before);
    }

    #[test]
    fn test_player_check_precedes_move_id_check() {
        let mut s = session();
        let result = s.place_mark(&bob(), MoveId::new(42), 0, 0);
        assert_eq!(result, Err(PlaceError::NotActivePlayer));
    }

    #[test]
    fn test_occupied_and_out_of_range_rejected() {
        let mut s = session();
        play(&mut s, &[(0, 0)]);
        let id = s.expected_move_id();
        assert_eq!(s.place_mark(&bob(), id, 0, 0), Err(PlaceError::InvalidMove));
        assert_eq!(s.place_mark(&bob(), id, 3, 0), Err(PlaceError::InvalidMove));
        assert_eq!(s.place_mark(&bob(), id, 0, 7), Err(PlaceError::InvalidMove));
        assert_eq!(s.active_player(), Some(&bob()));
    }

    #[test]
    fn test_column_win() {
        let mut s = session();
        play(&mut s, &[(0, 0), (1, 1), (0, 1), (2, 2), (0, 2)]);
        let outcome = s.outcome().clone().expect("finished");
        assert_eq!(outcome.winner(), Some(&alice()));
        assert_eq!(outcome.lines(), &[WinningLine::new(Direction::Column, 0)]);
        assert_eq!(s.active_player(), None);
        assert_eq!(s.turn_count(), 5);
    }

    #[test]
    fn test_row_wins_over_down_diagonal() {
        let mut s = session();
        // X: (0,0) (1,1) (0,2) (1,2); O: (1,0) (2,0) (0,1) (2,1).
        // X at (2,2) completes row 2 and the down-diagonal together.
        play(
            &mut s,
            &[
                (0, 0),
                (1, 0),
                (1, 1),
                (2, 0),
                (0, 2),
                (0, 1),
                (1, 2),
                (2, 1),
            ],
        );
        assert!(s.outcome().is_none());
        play(&mut s, &[(2, 2)]);
        let outcome = s.outcome().clone().expect("finished");
        assert_eq!(outcome.lines(), &[WinningLine::new(Direction::Row, 2)]);
    }

    #[test]
    fn test_up_diagonal_win() {
        let mut s = session();
        play(&mut s, &[(0, 2), (0, 0), (1, 1), (1, 0), (2, 0)]);
        let outcome = s.outcome().clone().expect("finished");
        assert_eq!(outcome.lines(), &[WinningLine::new(Direction::DiagUp, 0)]);
    }

    #[test]
    fn test_down_diagonal_win() {
        let mut s = session();
        play(&mut s, &[(0, 0), (1, 0), (1, 1), (2, 0), (2, 2)]);
        let outcome = s.outcome().clone().expect("finished");
        assert_eq!(outcome.lines(), &[WinningLine::new(Direction::DiagDown, 0)]);
    }

    #[test]
    fn test_draw() {
        let mut s = session();
        // X O X
        // X O O
        // O X X
        play(
            &mut s,
            &[
                (0, 0),
                (1, 0),
                (2, 0),
                (1, 1),
                (0, 1),
                (2, 1),
                (1, 2),
                (0, 2),
                (2, 2),
            ],
        );
        let outcome = s.outcome().clone().expect("finished");
        assert!(outcome.is_draw());
        assert_eq!(outcome.to_record().winning_player_id, "");
        assert!(s.valid_moves().is_empty());
    }

    #[test]
    fn test_finished_session_rejects_moves() {
        let mut s = session();
        play(&mut s, &[(0, 0), (1, 1), (0, 1), (2, 2), (0, 2)]);
        let before = s.clone();
        // The index advanced past the winner, but nobody is active any more.
        let id = s.expected_move_id();
        assert_eq!(s.place_mark(&bob(), id, 2, 0), Err(PlaceError::NotActivePlayer));
        assert_eq!(s.place_mark(&alice(), id, 2, 0), Err(PlaceError::NotActivePlayer));
        assert_eq!(s, before);
    }

    #[test]
    fn test_valid_moves_track_grid() {
        let mut s = session();
        assert_eq!(s.valid_moves().len(), 1);
        play(&mut s, &[(0, 0)]);
        assert!(s.valid_moves().iter().all(|r| !r.contains(0, 0)));
    }
}
