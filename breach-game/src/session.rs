//! Session engine: selection rules, buffer, sequence matching and countdown.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{BufferEntry, Cell, GameConfiguration, SequenceProgress, fulfilled_length};
use crate::error::{BreachError, IllegalMove};

/// Grid axis a pick can be locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("row"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Constraint on the next pick while a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionState {
    /// Nothing picked yet; any cell is allowed.
    #[default]
    FreePick,
    /// The next pick must be in `column`.
    RowPick { column: usize },
    /// The next pick must be in `row`.
    ColumnPick { row: usize },
}

impl SelectionState {
    /// State after a pick at `(row, column)`, or the violated constraint.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalMove::WrongAxis`] if the pick leaves the locked row or column.
    pub const fn advance(self, row: usize, column: usize) -> Result<Self, IllegalMove> {
        match self {
            Self::FreePick => Ok(Self::RowPick { column }),
            Self::RowPick { column: locked } => {
                if column == locked {
                    Ok(Self::ColumnPick { row })
                } else {
                    Err(IllegalMove::WrongAxis {
                        axis: Axis::Column,
                        expected: locked,
                    })
                }
            }
            Self::ColumnPick { row: locked } => {
                if row == locked {
                    Ok(Self::RowPick { column })
                } else {
                    Err(IllegalMove::WrongAxis {
                        axis: Axis::Row,
                        expected: locked,
                    })
                }
            }
        }
    }

    /// Whether `(row, column)` satisfies this constraint.
    #[must_use]
    pub const fn allows(self, row: usize, column: usize) -> bool {
        self.advance(row, column).is_ok()
    }
}

/// Reason a session was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    /// The buffer filled up before every sequence was complete.
    BufferExhausted,
    /// The countdown ran out.
    TimedOut,
}

/// Overall state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionOutcome {
    InProgress { selection: SelectionState },
    Won,
    Lost { cause: LossCause },
}

impl SessionOutcome {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }

    #[must_use]
    pub const fn selection(self) -> Option<SelectionState> {
        match self {
            Self::InProgress { selection } => Some(selection),
            Self::Won | Self::Lost { .. } => None,
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress { .. } => f.write_str("in_progress"),
            Self::Won => f.write_str("won"),
            Self::Lost {
                cause: LossCause::BufferExhausted,
            } => f.write_str("lost_buffer"),
            Self::Lost {
                cause: LossCause::TimedOut,
            } => f.write_str("lost_timeout"),
        }
    }
}

/// Buffers never exceed the generator's eight-slot cap in normal play.
pub type Buffer = SmallVec<[BufferEntry; 8]>;

/// One play-through of a [`GameConfiguration`].
///
/// The countdown starts at construction. Expiry is derived from the clock
/// on every query, and committed (outcome set, clock stopped) by the next
/// `pick` or `poll`.
#[derive(Debug, Clone)]
pub struct BreachSession<C: Clock = SystemClock> {
    config: GameConfiguration,
    size: usize,
    buffer: Buffer,
    outcome: SessionOutcome,
    clock: C,
    started_at: Duration,
    stopped_at: Option<Duration>,
}

impl BreachSession<SystemClock> {
    /// Start a session on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
    pub fn new(config: GameConfiguration) -> Result<Self, BreachError> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: Clock> BreachSession<C> {
    /// Start a session measured against `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
    pub fn with_clock(config: GameConfiguration, clock: C) -> Result<Self, BreachError> {
        let size = config.size()?;
        let started_at = clock.now();
        log::debug!(
            "session started: {size}x{size}, {} sequences, buffer {}, timeout {}ms",
            config.sequences.len(),
            config.max_buffer_length,
            config.timeout_milliseconds
        );
        Ok(Self {
            config,
            size,
            buffer: Buffer::new(),
            outcome: SessionOutcome::InProgress {
                selection: SelectionState::FreePick,
            },
            clock,
            started_at,
            stopped_at: None,
        })
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn configuration(&self) -> &GameConfiguration {
        &self.config
    }

    /// Picks so far, oldest first.
    #[must_use]
    pub fn buffer(&self) -> &[BufferEntry] {
        &self.buffer
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Value and usage of the cell at `(row, column)`.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::OutOfBounds`] if either coordinate is off the grid.
    pub fn get_cell(&self, row: usize, column: usize) -> Result<Cell, BreachError> {
        self.check_bounds(row, column)?;
        Ok(Cell {
            value: self.config.matrix[row + column * self.size].clone(),
            is_used: self.is_used(row, column),
        })
    }

    /// Progress of every target sequence against the current buffer.
    #[must_use]
    pub fn get_sequences(&self) -> Vec<SequenceProgress> {
        self.config
            .sequences
            .iter()
            .map(|sequence| SequenceProgress {
                sequence: sequence.clone(),
                number_of_fulfilled: fulfilled_length(
                    self.buffer.iter().map(|entry| entry.value.as_str()),
                    sequence,
                ),
            })
            .collect()
    }

    /// Current outcome, reporting a loss as soon as the countdown has run out.
    #[must_use]
    pub fn outcome(&self) -> SessionOutcome {
        if self.timeout_due() {
            SessionOutcome::Lost {
                cause: LossCause::TimedOut,
            }
        } else {
            self.outcome
        }
    }

    /// Selection constraint for the next pick, or `None` once the session is over.
    #[must_use]
    pub fn selection(&self) -> Option<SelectionState> {
        self.outcome().selection()
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.outcome().is_terminal()
    }

    /// Milliseconds left on the countdown, frozen once the session is over.
    #[must_use]
    pub fn remaining_milliseconds(&self) -> u64 {
        let remaining = self.timeout().saturating_sub(self.elapsed());
        u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX)
    }

    /// Clock reading at which the countdown runs out.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.started_at + self.timeout()
    }

    /// Commit a due timeout and return the outcome.
    pub fn poll(&mut self) -> SessionOutcome {
        if self.timeout_due() {
            self.expire();
        }
        self.outcome
    }

    /// Pick the cell at `(row, column)`.
    ///
    /// Nothing changes when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BreachError::OutOfBounds`] for coordinates off the grid and
    /// [`BreachError::IllegalMove`] if the session is over, the cell is used,
    /// or the pick leaves the locked row or column.
    pub fn pick(&mut self, row: usize, column: usize) -> Result<SessionOutcome, BreachError> {
        self.check_bounds(row, column)?;

        let selection = match self.poll() {
            SessionOutcome::InProgress { selection } => selection,
            SessionOutcome::Won | SessionOutcome::Lost { .. } => {
                return Err(IllegalMove::SessionOver.into());
            }
        };
        if self.is_used(row, column) {
            return Err(IllegalMove::CellUsed.into());
        }
        let next = selection.advance(row, column)?;

        let value = self.config.matrix[row + column * self.size].clone();
        log::debug!("pick ({row}, {column}) = {value}: {selection:?} -> {next:?}");
        self.buffer.push(BufferEntry { value, row, column });
        self.outcome = SessionOutcome::InProgress { selection: next };

        if self.get_sequences().iter().all(SequenceProgress::is_complete) {
            self.finish(SessionOutcome::Won);
        } else if self.buffer.len() >= self.config.max_buffer_length {
            self.finish(SessionOutcome::Lost {
                cause: LossCause::BufferExhausted,
            });
        }

        Ok(self.outcome)
    }

    /// Apply the timeout loss: outcome becomes `Lost(TimedOut)` and the
    /// countdown freezes at zero.
    ///
    /// Has no effect on a session that is already over.
    pub fn expire(&mut self) {
        if self.outcome.is_terminal() {
            return;
        }
        self.stop_clock(self.deadline());
        self.outcome = SessionOutcome::Lost {
            cause: LossCause::TimedOut,
        };
        log::info!("session lost: countdown expired");
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.stop_clock(self.clock.now());
        self.outcome = outcome;
        log::info!(
            "session {outcome} after {} picks with {}ms left",
            self.buffer.len(),
            self.remaining_milliseconds()
        );
    }

    fn stop_clock(&mut self, at: Duration) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(at);
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_milliseconds)
    }

    fn elapsed(&self) -> Duration {
        let end = self.stopped_at.unwrap_or_else(|| self.clock.now());
        end.saturating_sub(self.started_at)
    }

    fn timeout_due(&self) -> bool {
        self.stopped_at.is_none()
            && !self.outcome.is_terminal()
            && self.clock.now().saturating_sub(self.started_at) >= self.timeout()
    }

    fn is_used(&self, row: usize, column: usize) -> bool {
        self.buffer
            .iter()
            .any(|entry| entry.row == row && entry.column == column)
    }

    fn check_bounds(&self, row: usize, column: usize) -> Result<(), BreachError> {
        if row >= self.size || column >= self.size {
            return Err(BreachError::OutOfBounds {
                row,
                column,
                size: self.size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const UNLIMITED_BUFFER: usize = 999;
    const UNLIMITED_TIME: u64 = 999 * 1000;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn three_by_three() -> Vec<String> {
        strings(&["00", "10", "20", "01", "11", "21", "02", "12", "22"])
    }

    fn session(
        matrix: Vec<String>,
        sequences: &[&[&str]],
        max_buffer_length: usize,
    ) -> BreachSession<ManualClock> {
        let sequences = sequences.iter().map(|s| strings(s)).collect();
        let config =
            GameConfiguration::new(matrix, sequences, max_buffer_length, UNLIMITED_TIME).unwrap();
        BreachSession::with_clock(config, ManualClock::new()).unwrap()
    }

    #[test]
    fn size_is_derived_from_matrix() {
        assert_eq!(session(strings(&["00"]), &[&["AA"]], 9).size(), 1);
        assert_eq!(session(strings(&["00", "01", "10", "11"]), &[], 9).size(), 2);
        assert!(
            BreachSession::new(GameConfiguration {
                matrix: strings(&["a", "b"]),
                sequences: vec![],
                max_buffer_length: 1,
                timeout_milliseconds: 1,
            })
            .is_err()
        );
    }

    #[test]
    fn get_cell_reads_column_major() {
        let game = session(three_by_three(), &[&["AA"]], UNLIMITED_BUFFER);
        assert_eq!(
            game.get_cell(0, 2).unwrap(),
            Cell {
                value: "02".to_string(),
                is_used: false
            }
        );
        assert_eq!(game.get_cell(2, 1).unwrap().value, "21");
        assert!(matches!(
            game.get_cell(3, 0),
            Err(BreachError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn starts_with_free_pick() {
        let game = session(three_by_three(), &[&["AA"]], 1);
        assert_eq!(game.selection(), Some(SelectionState::FreePick));
        assert!(game.buffer().is_empty());
    }

    #[test]
    fn selection_alternates_between_axes() {
        let mut game = session(three_by_three(), &[&["AA"]], UNLIMITED_BUFFER);
        game.pick(0, 0).unwrap();
        assert_eq!(game.selection(), Some(SelectionState::RowPick { column: 0 }));
        assert!(game.get_cell(0, 0).unwrap().is_used);

        let err = game.pick(0, 2).unwrap_err();
        assert_eq!(
            err,
            BreachError::IllegalMove(IllegalMove::WrongAxis {
                axis: Axis::Column,
                expected: 0
            })
        );
        assert_eq!(game.buffer().len(), 1);

        game.pick(2, 0).unwrap();
        assert_eq!(game.selection(), Some(SelectionState::ColumnPick { row: 2 }));
        game.pick(2, 1).unwrap();
        assert_eq!(game.selection(), Some(SelectionState::RowPick { column: 1 }));
    }

    #[test]
    fn cannot_pick_cell_twice() {
        let mut game = session(three_by_three(), &[&["AA"]], UNLIMITED_BUFFER);
        game.pick(0, 0).unwrap();
        assert_eq!(
            game.pick(0, 0).unwrap_err(),
            BreachError::IllegalMove(IllegalMove::CellUsed)
        );
    }

    #[test]
    fn picks_outside_the_grid_fail() {
        let mut game = session(three_by_three(), &[], UNLIMITED_BUFFER);
        for (row, column) in [(3, 0), (0, 3), (usize::MAX, 0), (0, usize::MAX)] {
            assert!(matches!(
                game.pick(row, column),
                Err(BreachError::OutOfBounds { .. })
            ));
        }
        assert_eq!(game.selection(), Some(SelectionState::FreePick));
    }

    #[test]
    fn picking_fills_buffer_and_progresses_sequence() {
        let mut game = session(three_by_three(), &[&["00", "10", "20"]], UNLIMITED_BUFFER);
        assert_eq!(game.get_sequences()[0].number_of_fulfilled, 0);
        game.pick(0, 0).unwrap();
        assert_eq!(
            game.buffer(),
            &[BufferEntry {
                value: "00".to_string(),
                row: 0,
                column: 0
            }]
        );
        assert_eq!(
            game.get_sequences(),
            vec![SequenceProgress {
                sequence: strings(&["00", "10", "20"]),
                number_of_fulfilled: 1
            }]
        );
    }

    #[test]
    fn progress_follows_current_buffer() {
        let matrix = strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]);
        let mut game = session(matrix, &[&["AA", "BB", "CC"]], UNLIMITED_BUFFER);
        let progress = |game: &BreachSession<ManualClock>| game.get_sequences()[0].number_of_fulfilled;

        assert_eq!(progress(&game), 0);
        for ((row, column), expected) in [(0, 0), (2, 0), (2, 1), (0, 1), (0, 2)]
            .into_iter()
            .zip([1, 2, 1, 2, 3])
        {
            game.pick(row, column).unwrap();
            assert_eq!(progress(&game), expected, "after pick ({row}, {column})");
        }
        assert_eq!(game.outcome(), SessionOutcome::Won);
    }

    #[test]
    fn completing_every_sequence_wins() {
        let matrix = strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]);
        let mut game = session(matrix, &[&["AA", "BB", "CC"]], 3);
        game.pick(0, 0).unwrap();
        game.pick(2, 0).unwrap();
        assert_eq!(game.pick(2, 2).unwrap(), SessionOutcome::Won);
        assert_eq!(
            game.pick(0, 2).unwrap_err(),
            BreachError::IllegalMove(IllegalMove::SessionOver)
        );
        assert_eq!(game.buffer().len(), 3);
    }

    #[test]
    fn filling_the_buffer_loses() {
        let matrix = strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]);
        let mut game = session(matrix, &[&["AA", "BB", "CC"]], 3);
        game.pick(0, 0).unwrap();
        game.pick(1, 0).unwrap();
        let outcome = game.pick(1, 2).unwrap();
        assert_eq!(
            outcome,
            SessionOutcome::Lost {
                cause: LossCause::BufferExhausted
            }
        );
        assert!(game.pick(2, 2).is_err());
        assert_eq!(game.outcome(), outcome);
    }

    #[test]
    fn no_sequences_wins_on_first_pick() {
        let mut game = session(three_by_three(), &[], UNLIMITED_BUFFER);
        assert_eq!(game.pick(1, 1).unwrap(), SessionOutcome::Won);
    }

    #[test]
    fn countdown_expires_into_loss() {
        let clock = ManualClock::new();
        let matrix = strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]);
        let config = GameConfiguration::new(matrix, vec![strings(&["AA"])], 3, 10_000).unwrap();
        let mut game = BreachSession::with_clock(config, clock.clone()).unwrap();

        clock.advance(1_000);
        assert_eq!(game.remaining_milliseconds(), 9_000);
        clock.advance(1_000);
        assert_eq!(game.remaining_milliseconds(), 8_000);
        clock.advance(8_000);
        assert_eq!(
            game.outcome(),
            SessionOutcome::Lost {
                cause: LossCause::TimedOut
            }
        );
        assert_eq!(game.remaining_milliseconds(), 0);
        clock.advance(1_000);
        assert_eq!(game.remaining_milliseconds(), 0);
        assert_eq!(
            game.pick(0, 0).unwrap_err(),
            BreachError::IllegalMove(IllegalMove::SessionOver)
        );
        assert!(game.buffer().is_empty());
        assert_eq!(game.remaining_milliseconds(), 0);
    }

    #[test]
    fn clock_stops_when_game_is_won() {
        let clock = ManualClock::new();
        let matrix = strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]);
        let config =
            GameConfiguration::new(matrix, vec![strings(&["AA"])], UNLIMITED_BUFFER, 10_000)
                .unwrap();
        let mut game = BreachSession::with_clock(config, clock.clone()).unwrap();

        clock.advance(1_000);
        assert_eq!(game.pick(0, 0).unwrap(), SessionOutcome::Won);
        assert_eq!(game.remaining_milliseconds(), 9_000);
        clock.advance(1_000);
        assert_eq!(game.remaining_milliseconds(), 9_000);
        clock.advance(60_000);
        assert_eq!(game.outcome(), SessionOutcome::Won);
    }

    #[test]
    fn expire_is_ignored_after_a_win() {
        let mut game = session(three_by_three(), &[&["00"]], UNLIMITED_BUFFER);
        game.pick(0, 0).unwrap();
        let remaining = game.remaining_milliseconds();
        game.expire();
        assert_eq!(game.outcome(), SessionOutcome::Won);
        assert_eq!(game.remaining_milliseconds(), remaining);
    }

    #[test]
    fn poll_commits_a_due_timeout() {
        let clock = ManualClock::new();
        let config = GameConfiguration::new(three_by_three(), vec![], 4, 500).unwrap();
        let mut game = BreachSession::with_clock(config, clock.clone()).unwrap();
        assert!(!game.poll().is_terminal());
        clock.advance(750);
        assert_eq!(
            game.poll(),
            SessionOutcome::Lost {
                cause: LossCause::TimedOut
            }
        );
        assert_eq!(game.remaining_milliseconds(), 0);
    }

    #[test]
    fn selection_state_advance_table() {
        assert_eq!(
            SelectionState::FreePick.advance(4, 2),
            Ok(SelectionState::RowPick { column: 2 })
        );
        assert_eq!(
            SelectionState::RowPick { column: 2 }.advance(1, 2),
            Ok(SelectionState::ColumnPick { row: 1 })
        );
        assert_eq!(
            SelectionState::ColumnPick { row: 1 }.advance(1, 0),
            Ok(SelectionState::RowPick { column: 0 })
        );
        assert!(!SelectionState::ColumnPick { row: 1 }.allows(0, 0));
    }
}
