//! Error types shared by the session engine, the generator and storage.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::GeneratorConfigError;
use crate::session::Axis;

/// Why a pick was rejected even though its coordinates were on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalMove {
    /// The cell already sits in the buffer.
    CellUsed,
    /// The pick does not share the required axis with the previous pick.
    WrongAxis { axis: Axis, expected: usize },
    /// The session already ended in a win or a loss.
    SessionOver,
}

impl std::fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CellUsed => f.write_str("cell was already picked"),
            Self::WrongAxis { axis, expected } => {
                write!(f, "pick must stay in {axis} {expected}")
            }
            Self::SessionOver => f.write_str("session is already over"),
        }
    }
}

/// Errors raised by game operations. State is never modified when one is returned.
#[derive(Debug, Error, PartialEq)]
pub enum BreachError {
    #[error("cell ({row}, {column}) is outside the {size}x{size} matrix")]
    OutOfBounds {
        row: usize,
        column: usize,
        size: usize,
    },
    #[error("illegal move: {0}")]
    IllegalMove(IllegalMove),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Config(#[from] GeneratorConfigError),
}

impl From<IllegalMove> for BreachError {
    fn from(value: IllegalMove) -> Self {
        Self::IllegalMove(value)
    }
}

/// Errors raised by [`crate::storage::GameStorage`] implementations and save helpers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for key '{key}'")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("save data under key '{key}' is not valid JSON")]
    Format {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by [`crate::BreachEngine`], which touches both game rules and storage.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Game(#[from] BreachError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
