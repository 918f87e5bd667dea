//! Error types for the session engine.

use crate::session::SessionId;
use derive_more::{Display, Error};
use tracing::instrument;

/// Reasons a move is rejected by a session.
///
/// These are client-correctable and never change session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PlaceError {
    /// The requesting player is not the one to move, or the game is over.
    #[display("Not the active player")]
    NotActivePlayer,
    /// The echoed move id does not match the session's expected id.
    #[display("Move id does not match the current turn")]
    InvalidMoveId,
    /// Coordinates are off the grid or the cell is taken.
    #[display("Invalid move")]
    InvalidMove,
}

impl std::error::Error for PlaceError {}

/// Failure of a registry operation as a whole.
#[derive(Debug, Clone, Display)]
pub enum RegistryError {
    /// Sessions need exactly two distinct players.
    #[display("Number of distinct players must be 2, got {}", _0)]
    InvalidPlayerCount(usize),
    /// No session is registered under the id.
    #[display("Session {} not found", _0)]
    SessionNotFound(SessionId),
    /// The event could not be handed to the stream. Nothing was committed.
    #[display("{}", _0)]
    Publish(PublishError),
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Publish(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PublishError> for RegistryError {
    fn from(err: PublishError) -> Self {
        RegistryError::Publish(err)
    }
}

/// Event stream failure with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Publish error: {} at {}:{}", message, file, line)]
pub struct PublishError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PublishError {
    /// Creates a new publish error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<serde_json::Error> for PublishError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Encoding event: {}", err))
    }
}

impl From<std::io::Error> for PublishError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("Writing event: {}", err))
    }
}
