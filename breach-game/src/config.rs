//! Level data handed from the generator to a session.
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::error::BreachError;

/// Immutable description of one level.
///
/// `matrix` is a `size x size` grid stored column-major: the value at
/// `(row, column)` lives at `row + column * size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfiguration {
    pub matrix: Vec<String>,
    #[serde(default)]
    pub sequences: Vec<Vec<String>>,
    pub max_buffer_length: usize,
    pub timeout_milliseconds: u64,
}

impl GameConfiguration {
    /// Build a configuration, rejecting matrices whose length is not a perfect square.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if `matrix.len()` is not a perfect square.
    pub fn new(
        matrix: Vec<String>,
        sequences: Vec<Vec<String>>,
        max_buffer_length: usize,
        timeout_milliseconds: u64,
    ) -> Result<Self, BreachError> {
        let config = Self {
            matrix,
            sequences,
            max_buffer_length,
            timeout_milliseconds,
        };
        config.size()?;
        Ok(config)
    }

    /// Load a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Side length of the square matrix.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
    pub fn size(&self) -> Result<usize, BreachError> {
        let len = self.matrix.len();
        let size = len.isqrt();
        if size * size == len {
            Ok(size)
        } else {
            Err(BreachError::InvalidArgument(format!(
                "matrix of {len} cells is not square"
            )))
        }
    }

    /// Stable xxHash64 of the configuration's JSON form.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }
}

/// A matrix cell as seen by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: String,
    pub is_used: bool,
}

/// One successful pick, in pick order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferEntry {
    pub value: String,
    pub row: usize,
    pub column: usize,
}

/// How far a target sequence is matched by the current buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceProgress {
    pub sequence: Vec<String>,
    pub number_of_fulfilled: usize,
}

impl SequenceProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.number_of_fulfilled == self.sequence.len()
    }
}

/// Best match of `sequence` against the buffer, over every start offset.
///
/// A run starting at an offset counts the buffer values that equal the
/// sequence's prefix position by position. A run that hits a mismatch before
/// the sequence is complete counts as zero; a run that reaches the end of the
/// buffer keeps its partial length.
#[must_use]
pub fn fulfilled_length<'a, I>(buffer: I, sequence: &[String]) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let values: Vec<&str> = buffer.into_iter().collect();
    (0..values.len())
        .map(|start| {
            let mut matched = 0;
            for (value, wanted) in values[start..].iter().zip(sequence) {
                if *value != wanted.as_str() {
                    return 0;
                }
                matched += 1;
            }
            matched
        })
        .max()
        .unwrap_or(0)
}
