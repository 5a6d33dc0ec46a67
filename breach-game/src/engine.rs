use crate::clock::{Clock, SystemClock};
use crate::error::{BreachError, EngineError, StorageError};
use crate::generator::Generator;
use crate::session::{BreachSession, SessionOutcome};
use crate::storage::{GameStorage, SaveGame, load_game, save_game};

/// Ties level generation to saved progress.
pub struct BreachEngine<S>
where
    S: GameStorage,
{
    generator: Generator,
    storage: S,
}

impl<S> BreachEngine<S>
where
    S: GameStorage,
{
    /// Create an engine with the default generator tuning.
    pub fn new(storage: S) -> Self {
        Self::with_generator(Generator::default(), storage)
    }

    pub const fn with_generator(generator: Generator, storage: S) -> Self {
        Self { generator, storage }
    }

    pub const fn generator(&self) -> &Generator {
        &self.generator
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Generate `level` from `seed` and start a session on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if `level` is zero.
    pub fn start_level(
        &self,
        level: u32,
        seed: &str,
    ) -> Result<BreachSession<SystemClock>, BreachError> {
        self.start_level_with_clock(level, seed, SystemClock::new())
    }

    /// Same as [`Self::start_level`], measured against `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if `level` is zero.
    pub fn start_level_with_clock<C: Clock>(
        &self,
        level: u32,
        seed: &str,
        clock: C,
    ) -> Result<BreachSession<C>, BreachError> {
        let config = self.generator.generate(level, seed)?;
        log::info!("starting level {level} (seed {seed:?})");
        BreachSession::with_clock(config, clock)
    }

    /// Saved progress, or a fresh record at level 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or parsed.
    pub fn progress(&self) -> Result<SaveGame, StorageError> {
        Ok(load_game(&self.storage)?.unwrap_or_default())
    }

    /// Start the saved level.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or holds level zero.
    pub fn resume(&self, seed: &str) -> Result<(SaveGame, BreachSession<SystemClock>), EngineError> {
        let save = self.progress()?;
        let session = self.start_level(save.level, seed)?;
        Ok((save, session))
    }

    /// Fold a finished session into the save record and persist it.
    ///
    /// A win advances to the next level and adds `score`. Any other outcome
    /// leaves the record as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or written.
    pub fn record_result(
        &self,
        level: u32,
        outcome: SessionOutcome,
        score: u32,
    ) -> Result<SaveGame, StorageError> {
        let mut save = self.progress()?;
        if outcome == SessionOutcome::Won {
            save.level = level.saturating_add(1).max(save.level);
            save.score = save.score.saturating_add(score);
            log::info!("level {level} cleared, advancing to {}", save.level);
        } else {
            log::debug!("level {level} ended {outcome}, save unchanged");
        }
        save_game(&self.storage, &save)?;
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::LossCause;
    use crate::storage::MemoryStorage;

    #[test]
    fn fresh_storage_starts_at_level_one() {
        let engine = BreachEngine::new(MemoryStorage::default());
        assert_eq!(engine.progress().unwrap(), SaveGame::default());

        let (save, session) = engine.resume("fresh").unwrap();
        assert_eq!(save.level, 1);
        assert_eq!(session.size(), 3);
    }

    #[test]
    fn win_advances_and_loss_keeps_level() {
        let storage = MemoryStorage::default();
        let engine = BreachEngine::new(storage.clone());

        let save = engine.record_result(1, SessionOutcome::Won, 120).unwrap();
        assert_eq!(save, SaveGame { level: 2, score: 120 });

        let lost = SessionOutcome::Lost {
            cause: LossCause::TimedOut,
        };
        let save = engine.record_result(2, lost, 500).unwrap();
        assert_eq!(save, SaveGame { level: 2, score: 120 });

        // A second engine over the same storage sees the record.
        let other = BreachEngine::new(storage);
        assert_eq!(other.progress().unwrap().level, 2);
    }

    #[test]
    fn replaying_an_old_level_never_moves_progress_back() {
        let engine = BreachEngine::new(MemoryStorage::default());
        engine.record_result(4, SessionOutcome::Won, 0).unwrap();
        let save = engine.record_result(1, SessionOutcome::Won, 10).unwrap();
        assert_eq!(save.level, 5);
        assert_eq!(save.score, 10);
    }

    #[test]
    fn start_level_matches_generator() {
        let engine = BreachEngine::new(MemoryStorage::default());
        let session = engine
            .start_level_with_clock(12, "engine", ManualClock::new())
            .unwrap();
        let expected = engine.generator().generate(12, "engine").unwrap();
        assert_eq!(session.configuration(), &expected);
        assert!(matches!(
            engine.start_level(0, "engine"),
            Err(BreachError::InvalidArgument(_))
        ));
    }
}
