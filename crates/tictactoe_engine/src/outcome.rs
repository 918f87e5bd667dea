//! Terminal results of a session.

use crate::session::PlayerId;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Orientation of a completed line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// A horizontal line; the index is the row.
    Row,
    /// A vertical line; the index is the column.
    Column,
    /// From (0,2) to (2,0).
    DiagUp,
    /// From (0,0) to (2,2).
    DiagDown,
}

/// A line of three equal marks that ended the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct WinningLine {
    /// Orientation.
    pub direction: Direction,
    /// Row or column index. Always 0 for diagonals.
    pub index: usize,
}

/// Result of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// A player completed a line.
    Win {
        /// The player who made the winning move.
        player: PlayerId,
        /// Completed lines. The engine records the first match only.
        lines: Vec<WinningLine>,
    },
    /// The grid filled up without a completed line.
    Draw,
}

impl Outcome {
    /// Returns the winning player, if any.
    pub fn winner(&self) -> Option<&PlayerId> {
        match self {
            Outcome::Win { player, .. } => Some(player),
            Outcome::Draw => None,
        }
    }

    /// Returns true if the game was a draw.
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw)
    }

    /// Returns the completed lines; empty for a draw.
    pub fn lines(&self) -> &[WinningLine] {
        match self {
            Outcome::Win { lines, .. } => lines,
            Outcome::Draw => &[],
        }
    }

    /// Flat descriptor used on the event stream.
    pub fn to_record(&self) -> WinnerRecord {
        WinnerRecord {
            winning_player_id: self.winner().map(|p| p.to_string()).unwrap_or_default(),
            is_draw: self.is_draw(),
            lines: self.lines().to_vec(),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win { player, lines } => match lines.first() {
                Some(line) => write!(f, "{} wins on {} {}", player, line.direction, line.index),
                None => write!(f, "{} wins", player),
            },
            Outcome::Draw => write!(f, "Draw"),
        }
    }
}

/// Winner descriptor as consumers of the event stream see it.
///
/// `winning_player_id` is empty for a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    /// Player who won, or empty.
    pub winning_player_id: String,
    /// True for a draw.
    pub is_draw: bool,
    /// Completed lines.
    pub lines: Vec<WinningLine>,
}
