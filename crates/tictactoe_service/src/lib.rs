//! Stdio game service around the tic-tac-toe session engine.
//!
//! Wires a [`tictactoe_engine::SessionRegistry`] to a configured event sink
//! through the engine's outbox, and answers line-delimited JSON requests.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod sink;
mod transport;

pub use config::{ConfigError, EventTarget, OutboxConfig, ServiceConfig};
pub use sink::JsonLinesSink;
pub use transport::{Request, Response, dispatch, handle_line, serve};
