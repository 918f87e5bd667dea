//! Tic-tac-toe session engine.
//!
//! Authoritative game state behind a two-player grid game service: it owns
//! concurrently running sessions, enforces turn order and move legality,
//! detects wins and draws, and describes the remaining legal moves as a
//! short list of rectangles.
//!
//! # Architecture
//!
//! - **Grid**: 3x3 cells and line queries
//! - **Session**: one game; turn order, move ids, outcome
//! - **Move ranges**: greedy compression of the empty cells
//! - **Registry**: sharded session map; publishes an event per accepted
//!   transition through an [`EventPublisher`]
//! - **Outbox**: queue that keeps a slow stream off the gameplay path
//!
//! # Example
//!
//! ```
//! use tictactoe_engine::{PlayerId, RecordingPublisher, SessionRegistry, TurnReply, TurnRequest};
//!
//! # fn main() -> Result<(), tictactoe_engine::RegistryError> {
//! let events = RecordingPublisher::new();
//! let registry = SessionRegistry::new(events.clone());
//!
//! let players = [PlayerId::from("alice"), PlayerId::from("bob")];
//! let created = registry.create_session(&players)?;
//!
//! let reply = registry.apply_turn(&TurnRequest::new(
//!     created.session_id.clone(),
//!     PlayerId::from("alice"),
//!     created.move_id,
//!     1,
//!     1,
//! ))?;
//! assert!(matches!(reply, TurnReply::Accepted { .. }));
//! assert_eq!(events.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod event;
mod grid;
mod move_range;
mod outbox;
mod outcome;
mod publisher;
mod registry;
mod session;

pub use error::{PlaceError, PublishError, RegistryError};
pub use event::{Coordinates, DEFAULT_TOPIC, EventEnvelope, EventKind, GameEvent, TurnStatus};
pub use grid::{GRID_SIZE, Grid, Mark};
pub use move_range::{MoveRange, compress};
pub use outbox::{DEFAULT_CAPACITY, OutboxDispatcher, OutboxPublisher, RetryPolicy, outbox};
pub use outcome::{Direction, Outcome, WinnerRecord, WinningLine};
pub use publisher::{EventPublisher, RecordingPublisher, TracingPublisher};
pub use registry::{SessionCreated, SessionRegistry, TurnReply, TurnRequest};
pub use session::{MoveId, PlayerId, Session, SessionId};
