//! Line-delimited JSON request loop.
//!
//! Each input line is one request; each output line is the matching reply.
//! Malformed lines get an error reply and the loop keeps going.

use serde::{Deserialize, Serialize};
use tictactoe_engine::{
    EventPublisher, MoveId, MoveRange, Outcome, PlayerId, RegistryError, Session, SessionId,
    SessionRegistry, TurnReply, TurnRequest,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// A client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Start a game.
    CreateSession {
        /// Exactly two distinct ids; the first moves first.
        player_ids: Vec<PlayerId>,
    },
    /// Submit a move.
    ApplyTurn {
        /// Target session.
        session_id: SessionId,
        /// Submitting player.
        player_id: PlayerId,
        /// Move id from the previous reply.
        move_id: MoveId,
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },
    /// Read a session's state.
    GetSession {
        /// Session to read.
        session_id: SessionId,
    },
}

/// Reply to a request. Only ever written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Session started.
    Created {
        /// New session id.
        session_id: SessionId,
        /// First player to move.
        next_player: PlayerId,
        /// Move id for the first submission.
        move_id: MoveId,
        /// Compressed empty cells.
        valid_moves: Vec<MoveRange>,
    },
    /// Move accepted.
    Accepted {
        /// Move id for the next submission.
        move_id: MoveId,
        /// Player to move next.
        next_player: PlayerId,
        /// Compressed empty cells.
        valid_moves: Vec<MoveRange>,
    },
    /// Game over.
    Finished {
        /// Terminal result.
        outcome: Outcome,
    },
    /// Cell off the grid or taken.
    InvalidMove,
    /// Not this player's turn.
    NotActivePlayer,
    /// Stale move id.
    InvalidMoveId,
    /// Session state.
    Session {
        /// Copy of the session.
        session: Box<Session>,
        /// Grid rendered as text.
        board: String,
    },
    /// The request failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl From<TurnReply> for Response {
    fn from(reply: TurnReply) -> Self {
        match reply {
            TurnReply::Accepted {
                move_id,
                next_player,
                valid_moves,
            } => Response::Accepted {
                move_id,
                next_player,
                valid_moves,
            },
            TurnReply::Finished { outcome } => Response::Finished { outcome },
            TurnReply::InvalidMove => Response::InvalidMove,
            TurnReply::NotActivePlayer => Response::NotActivePlayer,
            TurnReply::InvalidMoveId => Response::InvalidMoveId,
        }
    }
}

impl From<RegistryError> for Response {
    fn from(err: RegistryError) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

/// Runs one request against the registry.
#[instrument(skip(registry))]
pub fn dispatch<P: EventPublisher>(registry: &SessionRegistry<P>, request: Request) -> Response {
    match request {
        Request::CreateSession { player_ids } => match registry.create_session(&player_ids) {
            Ok(created) => Response::Created {
                session_id: created.session_id,
                next_player: created.next_player,
                move_id: created.move_id,
                valid_moves: created.valid_moves,
            },
            Err(err) => err.into(),
        },
        Request::ApplyTurn {
            session_id,
            player_id,
            move_id,
            x,
            y,
        } => {
            let request = TurnRequest::new(session_id, player_id, move_id, x, y);
            match registry.apply_turn(&request) {
                Ok(reply) => reply.into(),
                Err(err) => err.into(),
            }
        }
        Request::GetSession { session_id } => match registry.session(&session_id) {
            Some(session) => Response::Session {
                board: session.grid().display(),
                session: Box::new(session),
            },
            None => RegistryError::SessionNotFound(session_id).into(),
        },
    }
}

/// Parses and runs a single request line.
pub fn handle_line<P: EventPublisher>(registry: &SessionRegistry<P>, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(registry, request),
        Err(err) => {
            debug!(error = %err, "Malformed request");
            Response::Error {
                message: format!("Malformed request: {}", err),
            }
        }
    }
}

/// Serves requests from `reader` until end of input, writing replies to
/// `writer`. Returns the number of requests handled.
#[instrument(skip_all)]
pub async fn serve<P, R, W>(
    registry: &SessionRegistry<P>,
    reader: R,
    mut writer: W,
) -> std::io::Result<usize>
where
    P: EventPublisher,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(registry, &line);
        if let Response::Error { message } = &response {
            warn!(%message, "Request failed");
        }
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }
    info!(handled, "Input closed");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_engine::RecordingPublisher;

    fn registry() -> SessionRegistry<RecordingPublisher> {
        SessionRegistry::new(RecordingPublisher::new())
    }

    fn create(registry: &SessionRegistry<RecordingPublisher>) -> SessionId {
        match handle_line(
            registry,
            r#"{"op":"create_session","player_ids":["alice","bob"]}"#,
        ) {
            Response::Created { session_id, .. } => session_id,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_create_and_play() {
        let registry = registry();
        let session_id = create(&registry);
        let line = format!(
            r#"{{"op":"apply_turn","session_id":"{}","player_id":"alice","move_id":0,"x":1,"y":1}}"#,
            session_id
        );
        match handle_line(&registry, &line) {
            Response::Accepted {
                move_id,
                next_player,
                ..
            } => {
                assert_eq!(move_id, MoveId::new(1));
                assert_eq!(next_player, PlayerId::from("bob"));
            }
            other => panic!("Unexpected response {:?}", other),
        }
        assert_eq!(handle_line(&registry, &line), Response::NotActivePlayer);
    }

    #[test]
    fn test_bad_player_count() {
        let registry = registry();
        let response = handle_line(&registry, r#"{"op":"create_session","player_ids":["solo"]}"#);
        assert!(matches!(response, Response::Error { .. }));
    }

    #[test]
    fn test_unknown_session() {
        let registry = registry();
        let response = handle_line(&registry, r#"{"op":"get_session","session_id":"nope"}"#);
        match response {
            Response::Error { message } => assert!(message.contains("not found")),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line() {
        let registry = registry();
        let response = handle_line(&registry, "not json");
        match response {
            Response::Error { message } => assert!(message.starts_with("Malformed request")),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_get_session() {
        let registry = registry();
        let session_id = create(&registry);
        let line = format!(r#"{{"op":"get_session","session_id":"{}"}}"#, session_id);
        match handle_line(&registry, &line) {
            Response::Session { session, board } => {
                assert_eq!(session.id(), &session_id);
                assert_eq!(board, "...\n...\n...");
            }
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_session_reply_is_written_as_json() {
        let registry = registry();
        let session_id = create(&registry);
        let line = format!(r#"{{"op":"get_session","session_id":"{}"}}"#, session_id);
        let json = serde_json::to_value(handle_line(&registry, &line)).expect("serialize");
        assert_eq!(json["status"], "session");
        assert_eq!(json["session"]["id"], session_id.as_str());
        assert_eq!(json["session"]["players"], serde_json::json!(["alice", "bob"]));
        assert_eq!(json["session"]["current_player_index"], 0);
        assert_eq!(json["board"], "...\n...\n...");
    }

    #[test]
    fn test_reply_serialization() {
        let json = serde_json::to_value(Response::InvalidMoveId).expect("serialize");
        assert_eq!(json, serde_json::json!({ "status": "invalid_move_id" }));
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let registry = registry();
        let input = concat!(
            r#"{"op":"create_session","player_ids":["alice","bob"]}"#,
            "\n\n",
            "garbage\n",
        );
        let mut output = Vec::new();
        let handled = serve(&registry, input.as_bytes(), &mut output)
            .await
            .expect("serve");
        assert_eq!(handled, 2);
        let text = String::from_utf8(output).expect("utf8");
        let replies: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("json"))
            .collect();
        assert_eq!(replies[0]["status"], "created");
        assert_eq!(replies[1]["status"], "error");
    }
}
