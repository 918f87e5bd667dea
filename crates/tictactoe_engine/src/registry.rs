//! Concurrency-safe collection of sessions and the two public operations.

use crate::error::{PlaceError, RegistryError};
use crate::event::GameEvent;
use crate::move_range::MoveRange;
use crate::outcome::Outcome;
use crate::publisher::EventPublisher;
use crate::session::{MoveId, PlayerId, Session, SessionId};
use dashmap::DashMap;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Result of a successful `create_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCreated {
    /// Id of the new session.
    pub session_id: SessionId,
    /// Player who moves first.
    pub next_player: PlayerId,
    /// Move id the first submission must echo.
    pub move_id: MoveId,
    /// Compressed empty cells.
    pub valid_moves: Vec<MoveRange>,
}

/// A move submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct TurnRequest {
    /// Target session.
    pub session_id: SessionId,
    /// Player submitting the move.
    pub player_id: PlayerId,
    /// Move id echoed from the last reply or event.
    pub move_id: MoveId,
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

/// Status of an `apply_turn` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnReply {
    /// The move was accepted and the game continues.
    Accepted {
        /// Move id the next submission must echo.
        move_id: MoveId,
        /// Player to move next.
        next_player: PlayerId,
        /// Compressed empty cells.
        valid_moves: Vec<MoveRange>,
    },
    /// The game is over, either by this move or before it.
    Finished {
        /// Terminal result.
        outcome: Outcome,
    },
    /// Coordinates off the grid or cell taken.
    InvalidMove,
    /// Not the requesting player's turn.
    NotActivePlayer,
    /// Stale or duplicated move id.
    InvalidMoveId,
}

impl From<PlaceError> for TurnReply {
    fn from(err: PlaceError) -> Self {
        match err {
            PlaceError::NotActivePlayer => TurnReply::NotActivePlayer,
            PlaceError::InvalidMoveId => TurnReply::InvalidMoveId,
            PlaceError::InvalidMove => TurnReply::InvalidMove,
        }
    }
}

/// Owns every session and publishes an event for each accepted transition.
///
/// Sessions sit behind their own lock in a sharded map, so turns on
/// unrelated sessions run in parallel while turns on one session are
/// serialized. A transition is committed only after its event was
/// published; if publishing fails the session keeps its previous state and
/// the call can be retried as is.
pub struct SessionRegistry<P> {
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
    publisher: P,
}

impl<P: EventPublisher> SessionRegistry<P> {
    /// Creates an empty registry publishing to `publisher`.
    #[instrument(skip(publisher))]
    pub fn new(publisher: P) -> Self {
        info!("Creating session registry");
        Self {
            sessions: DashMap::new(),
            publisher,
        }
    }

    /// The publisher events go to.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Starts a game between two distinct players; `player_ids[0]` moves
    /// first.
    #[instrument(skip(self))]
    pub fn create_session(&self, player_ids: &[PlayerId]) -> Result<SessionCreated, RegistryError> {
        let players: [PlayerId; 2] = match player_ids {
            [first, second] if first != second => [first.clone(), second.clone()],
            [_, _] => return Err(RegistryError::InvalidPlayerCount(1)),
            _ => return Err(RegistryError::InvalidPlayerCount(player_ids.len())),
        };

        let session = Session::new(players);
        let event = GameEvent::session_created(&session);
        self.publisher.publish(&event).inspect_err(|err| {
            warn!(session_id = %session.id(), error = %err, "Session not created, event not published");
        })?;

        let created = SessionCreated {
            session_id: session.id().clone(),
            next_player: session.players()[0].clone(),
            move_id: session.expected_move_id(),
            valid_moves: event.valid_moves.unwrap_or_default(),
        };
        self.sessions
            .insert(created.session_id.clone(), Arc::new(Mutex::new(session)));

        info!(session_id = %created.session_id, "Created new session");
        Ok(created)
    }

    /// Applies a move to a session.
    ///
    /// Rejections come back as [`TurnReply`] variants and publish nothing.
    /// Calls on a finished session return its outcome and publish nothing.
    #[instrument(skip(self, request), fields(session_id = %request.session_id, player_id = %request.player_id))]
    pub fn apply_turn(&self, request: &TurnRequest) -> Result<TurnReply, RegistryError> {
        let entry = self
            .sessions
            .get(&request.session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::SessionNotFound(request.session_id.clone()))?;

        let mut session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = session.outcome() {
            debug!("Session already finished");
            return Ok(TurnReply::Finished {
                outcome: outcome.clone(),
            });
        }

        let mut next = session.clone();
        if let Err(err) = next.place_mark(&request.player_id, request.move_id, request.x, request.y) {
            debug!(error = %err, "Move rejected");
            return Ok(err.into());
        }

        let event = GameEvent::turn_played(&next, &request.player_id, request.x, request.y);
        self.publisher.publish(&event).inspect_err(|err| {
            warn!(error = %err, "Move not committed, event not published");
        })?;

        let reply = match next.outcome() {
            Some(outcome) => TurnReply::Finished {
                outcome: outcome.clone(),
            },
            None => TurnReply::Accepted {
                move_id: next.expected_move_id(),
                next_player: next.current_player().clone(),
                valid_moves: event.valid_moves.unwrap_or_default(),
            },
        };
        info!(turn = next.turn_count(), "Turn applied");
        *session = next;
        Ok(reply)
    }

    /// Copy of a session's current state.
    pub fn session(&self, id: &SessionId) -> Option<Session> {
        let entry = Arc::clone(self.sessions.get(id)?.value());
        let session = entry.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Some(session)
    }

    /// Ids of every registered session, in no particular order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session was ever created.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<P> std::fmt::Debug for SessionRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}
