//! Breach Game Engine
//!
//! Platform-agnostic core of a breach puzzle: a session that enforces the
//! alternating row/column pick rule and tracks target sequences against a
//! countdown, plus a seeded generator producing reproducible levels.
//! This crate has no UI or platform-specific dependencies.

pub mod clock;
pub mod config;
#[cfg(feature = "async")]
pub mod countdown;
pub mod engine;
pub mod error;
pub mod generator;
pub mod rng;
pub mod session;
pub mod solver;
pub mod storage;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BufferEntry, Cell, GameConfiguration, SequenceProgress, fulfilled_length};
#[cfg(feature = "async")]
pub use countdown::{SharedSession, TokioClock};
pub use engine::BreachEngine;
pub use error::{BreachError, EngineError, IllegalMove, StorageError};
pub use generator::{Generator, GeneratorConfig, GeneratorConfigError, LevelParams, generate};
pub use rng::SeededRng;
pub use session::{Axis, BreachSession, LossCause, SelectionState, SessionOutcome};
pub use solver::{DEFAULT_NODE_BUDGET, Pick, SolveResult, find_sequence_path, solve};
pub use storage::{
    GameStorage, MemoryStorage, SAVE_GAME_KEY, SaveGame, clear_save, load_game, save_game,
};
