//! Procedural level generation.
//!
//! A level is a square matrix of symbols plus a set of target sequences that
//! are each guaranteed to be pickable under the row/column alternation rule.
//! All randomness for one call comes from a single stream seeded by the seed
//! text, drawn matrix first and sequences second.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GameConfiguration;
use crate::error::BreachError;
use crate::rng::SeededRng;

/// Largest matrix side a configuration may ask for.
pub const MAX_MATRIX_SIZE: usize = 32;
/// Upper bound for sequence counts and buffer lengths.
pub const MAX_POOL_LENGTH: usize = 64;

/// Errors raised when generator configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeneratorConfigError {
    #[error("{field} minimum {min} exceeds maximum {max}")]
    MinExceedsMax {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("{field} must be at most {max} (got {value})")]
    MaxViolation {
        field: &'static str,
        max: usize,
        value: usize,
    },
    #[error("symbol pool is empty")]
    EmptySymbols,
}

/// Difficulty constants driving level generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "GeneratorConfig::default_min_matrix_size")]
    pub min_matrix_size: usize,
    #[serde(default = "GeneratorConfig::default_max_matrix_size")]
    pub max_matrix_size: usize,
    #[serde(default = "GeneratorConfig::default_min_sequences")]
    pub min_sequences: usize,
    #[serde(default = "GeneratorConfig::default_max_sequences")]
    pub max_sequences: usize,
    #[serde(default = "GeneratorConfig::default_min_sequence_length")]
    pub min_sequence_length: usize,
    #[serde(default = "GeneratorConfig::default_min_buffer_length")]
    pub min_buffer_length: usize,
    #[serde(default = "GeneratorConfig::default_max_buffer_length")]
    pub max_buffer_length: usize,
    /// Levels between matrix size increases.
    #[serde(default = "GeneratorConfig::default_levels_per_matrix_growth")]
    pub levels_per_matrix_growth: usize,
    /// Levels, within one matrix size, between extra sequences.
    #[serde(default = "GeneratorConfig::default_levels_per_sequence_step")]
    pub levels_per_sequence_step: usize,
    #[serde(default = "GeneratorConfig::default_timeout_milliseconds")]
    pub timeout_milliseconds: u64,
    #[serde(default = "GeneratorConfig::default_symbols")]
    pub symbols: Vec<String>,
}

impl GeneratorConfig {
    const fn default_min_matrix_size() -> usize {
        3
    }

    const fn default_max_matrix_size() -> usize {
        8
    }

    const fn default_min_sequences() -> usize {
        2
    }

    const fn default_max_sequences() -> usize {
        7
    }

    const fn default_min_sequence_length() -> usize {
        2
    }

    const fn default_min_buffer_length() -> usize {
        4
    }

    const fn default_max_buffer_length() -> usize {
        8
    }

    const fn default_levels_per_matrix_growth() -> usize {
        10
    }

    const fn default_levels_per_sequence_step() -> usize {
        3
    }

    const fn default_timeout_milliseconds() -> u64 {
        60_000
    }

    fn default_symbols() -> Vec<String> {
        ["A0", "E9", "4C", "8B", "6F"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Load a generator configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the configuration for values the generator cannot work with.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), GeneratorConfigError> {
        Self::ensure_min("min_matrix_size", 2, self.min_matrix_size)?;
        Self::ensure_min("min_sequence_length", 1, self.min_sequence_length)?;
        Self::ensure_min("levels_per_matrix_growth", 1, self.levels_per_matrix_growth)?;
        Self::ensure_min("levels_per_sequence_step", 1, self.levels_per_sequence_step)?;
        Self::ensure_max("max_matrix_size", MAX_MATRIX_SIZE, self.max_matrix_size)?;
        Self::ensure_max("max_sequences", MAX_POOL_LENGTH, self.max_sequences)?;
        Self::ensure_max("max_buffer_length", MAX_POOL_LENGTH, self.max_buffer_length)?;
        Self::ensure_order("matrix_size", self.min_matrix_size, self.max_matrix_size)?;
        Self::ensure_order("sequences", self.min_sequences, self.max_sequences)?;
        Self::ensure_order(
            "buffer_length",
            self.min_buffer_length,
            self.max_buffer_length,
        )?;
        Self::ensure_order(
            "sequence_length",
            self.min_sequence_length,
            self.min_buffer_length,
        )?;
        if self.symbols.is_empty() {
            return Err(GeneratorConfigError::EmptySymbols);
        }
        Ok(())
    }

    const fn ensure_min(
        field: &'static str,
        min: usize,
        value: usize,
    ) -> Result<(), GeneratorConfigError> {
        if value < min {
            return Err(GeneratorConfigError::MinViolation { field, min, value });
        }
        Ok(())
    }

    const fn ensure_max(
        field: &'static str,
        max: usize,
        value: usize,
    ) -> Result<(), GeneratorConfigError> {
        if value > max {
            return Err(GeneratorConfigError::MaxViolation { field, max, value });
        }
        Ok(())
    }

    const fn ensure_order(
        field: &'static str,
        min: usize,
        max: usize,
    ) -> Result<(), GeneratorConfigError> {
        if min > max {
            return Err(GeneratorConfigError::MinExceedsMax { field, min, max });
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_matrix_size: Self::default_min_matrix_size(),
            max_matrix_size: Self::default_max_matrix_size(),
            min_sequences: Self::default_min_sequences(),
            max_sequences: Self::default_max_sequences(),
            min_sequence_length: Self::default_min_sequence_length(),
            min_buffer_length: Self::default_min_buffer_length(),
            max_buffer_length: Self::default_max_buffer_length(),
            levels_per_matrix_growth: Self::default_levels_per_matrix_growth(),
            levels_per_sequence_step: Self::default_levels_per_sequence_step(),
            timeout_milliseconds: Self::default_timeout_milliseconds(),
            symbols: Self::default_symbols(),
        }
    }
}

/// Difficulty numbers derived for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelParams {
    pub level: u32,
    pub matrix_size: usize,
    pub number_of_sequences: usize,
    pub max_buffer_length: usize,
    pub timeout_milliseconds: u64,
}

impl LevelParams {
    /// Parameters for a one-based `level`.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if `level` is zero.
    pub fn for_level(config: &GeneratorConfig, level: u32) -> Result<Self, BreachError> {
        if level < 1 {
            return Err(BreachError::InvalidArgument(format!(
                "level must be at least 1 (got {level})"
            )));
        }
        let step = usize::try_from(level - 1).map_err(|_| {
            BreachError::InvalidArgument(format!("level {level} is out of range"))
        })?;
        let growth = config.levels_per_matrix_growth.max(1);
        let sequence_step = config.levels_per_sequence_step.max(1);
        let matrix_size = config
            .min_matrix_size
            .saturating_add(step / growth)
            .min(config.max_matrix_size);
        let still_growing =
            step < config.max_matrix_size.saturating_mul(growth.saturating_add(1));
        let within_size = step % growth;

        let (number_of_sequences, max_buffer_length) = if still_growing {
            (
                config
                    .min_sequences
                    .saturating_add(within_size / sequence_step)
                    .min(config.max_sequences),
                config
                    .min_buffer_length
                    .saturating_add(within_size % sequence_step)
                    .min(config.max_buffer_length),
            )
        } else {
            (config.max_sequences, config.max_buffer_length)
        };

        Ok(Self {
            level,
            matrix_size,
            number_of_sequences,
            max_buffer_length,
            timeout_milliseconds: config.timeout_milliseconds,
        })
    }
}

/// Level generator bound to a validated [`GeneratorConfig`].
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the configuration for `level` from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if `level` is zero.
    pub fn generate(&self, level: u32, seed: &str) -> Result<GameConfiguration, BreachError> {
        let params = LevelParams::for_level(&self.config, level)?;
        let mut rng = SeededRng::from_seed_str(seed);

        let matrix = self.random_matrix(params.matrix_size, &mut rng);
        let sequences = (0..params.number_of_sequences)
            .map(|_| {
                let length = rng.int_inclusive(
                    self.config.min_sequence_length,
                    params.max_buffer_length,
                );
                SequenceWalk::new(&matrix, params.matrix_size).run(length, &mut rng)
            })
            .collect::<Vec<_>>();

        log::info!(
            "generated level {level} from seed '{seed}': {size}x{size}, {} sequences, buffer {}",
            sequences.len(),
            params.max_buffer_length,
            size = params.matrix_size
        );

        GameConfiguration::new(
            matrix,
            sequences,
            params.max_buffer_length,
            params.timeout_milliseconds,
        )
    }

    fn random_matrix(&self, size: usize, rng: &mut SeededRng) -> Vec<String> {
        let last = self.config.symbols.len() - 1;
        (0..size * size)
            .map(|_| self.config.symbols[rng.int_inclusive(0, last)].clone())
            .collect()
    }
}

/// Generate `level` from `seed` with the default difficulty curve.
///
/// # Errors
///
/// Returns [`BreachError::InvalidArgument`] if `level` is zero.
pub fn generate(level: u32, seed: &str) -> Result<GameConfiguration, BreachError> {
    Generator::default().generate(level, seed)
}

/// One sequence's walk over a private copy of the matrix.
///
/// The walk alternates axes the same way a session does: it starts in row 0
/// choosing a column, then chooses a row within that column, and so on.
struct SequenceWalk<'a> {
    matrix: &'a [String],
    size: usize,
    consumed: Vec<bool>,
}

impl<'a> SequenceWalk<'a> {
    fn new(matrix: &'a [String], size: usize) -> Self {
        Self {
            matrix,
            size,
            consumed: vec![false; matrix.len()],
        }
    }

    const fn index(&self, row: usize, column: usize) -> usize {
        row + column * self.size
    }

    fn unused_in_row(&self, row: usize) -> usize {
        (0..self.size)
            .filter(|&column| !self.consumed[self.index(row, column)])
            .count()
    }

    fn unused_in_column(&self, column: usize) -> usize {
        (0..self.size)
            .filter(|&row| !self.consumed[self.index(row, column)])
            .count()
    }

    fn run(mut self, length: usize, rng: &mut SeededRng) -> Vec<String> {
        let mut sequence = Vec::with_capacity(length.min(self.matrix.len()));
        let (mut row, mut column) = (0, 0);
        let mut search_in_row = true;

        while sequence.len() < length {
            let is_last = sequence.len() + 1 == length;
            // Unless this is the last element, the axis the pick opens must keep
            // one more unused cell for the next step.
            let guarded = |walk: &Self, candidate: usize| {
                let (r, c) = if search_in_row {
                    (row, candidate)
                } else {
                    (candidate, column)
                };
                let open = if search_in_row {
                    walk.unused_in_column(c)
                } else {
                    walk.unused_in_row(r)
                };
                !walk.consumed[walk.index(r, c)] && (is_last || open >= 2)
            };
            let unused = |walk: &Self, candidate: usize| {
                let idx = if search_in_row {
                    walk.index(row, candidate)
                } else {
                    walk.index(candidate, column)
                };
                !walk.consumed[idx]
            };

            let (candidate, dead_end) = match self.draw(rng, guarded) {
                Some(candidate) => (candidate, false),
                None => match self.draw(rng, unused) {
                    Some(candidate) => (candidate, true),
                    None => break,
                },
            };

            if search_in_row {
                column = candidate;
            } else {
                row = candidate;
            }
            search_in_row = !search_in_row;

            let idx = self.index(row, column);
            self.consumed[idx] = true;
            sequence.push(self.matrix[idx].clone());

            if dead_end {
                log::debug!(
                    "sequence walk cornered at ({row}, {column}); ending at length {}",
                    sequence.len()
                );
                break;
            }
        }

        sequence
    }

    /// Rejection-sample a candidate index on the active axis. Returns `None`
    /// without drawing when no candidate is acceptable.
    fn draw(
        &self,
        rng: &mut SeededRng,
        accept: impl Fn(&Self, usize) -> bool,
    ) -> Option<usize> {
        if !(0..self.size).any(|candidate| accept(self, candidate)) {
            return None;
        }
        loop {
            let candidate = rng.int_inclusive(0, self.size - 1);
            if accept(self, candidate) {
                return Some(candidate);
            }
            log::trace!("sequence walk rejected candidate {candidate}");
        }
    }
}
