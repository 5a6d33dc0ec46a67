//! Depth-first search over legal picks.
//!
//! Used to check that generated sequences can actually be entered and to
//! play generated levels headlessly.
use serde::{Deserialize, Serialize};

use crate::config::{GameConfiguration, fulfilled_length};
use crate::error::BreachError;
use crate::session::SelectionState;

/// Node budget used by callers that have no better estimate.
pub const DEFAULT_NODE_BUDGET: usize = 200_000;

/// A pick as `(row, column)`.
pub type Pick = (usize, usize);

/// Result of [`solve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "picks", rename_all = "snake_case")]
pub enum SolveResult {
    /// Picks that win the level when played in order from a fresh session.
    Solved(Vec<Pick>),
    /// No pick order within the buffer cap completes every sequence.
    Unsolvable,
    /// The search gave up before finishing.
    BudgetExhausted,
}

impl SolveResult {
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        matches!(self, Self::Solved(_))
    }
}

enum Step {
    Found,
    DeadEnd,
    OutOfBudget,
}

struct Search<'a> {
    config: &'a GameConfiguration,
    size: usize,
    used: Vec<bool>,
    values: Vec<&'a str>,
    path: Vec<Pick>,
    visited: usize,
    budget: usize,
}

impl<'a> Search<'a> {
    fn new(config: &'a GameConfiguration, budget: usize) -> Result<Self, BreachError> {
        let size = config.size()?;
        Ok(Self {
            config,
            size,
            used: vec![false; config.matrix.len()],
            values: Vec::new(),
            path: Vec::new(),
            visited: 0,
            budget,
        })
    }

    fn value(&self, (row, column): Pick) -> &'a str {
        self.config.matrix[row + column * self.size].as_str()
    }

    fn is_used(&self, (row, column): Pick) -> bool {
        self.used[row + column * self.size]
    }

    fn candidates(&self, selection: SelectionState) -> Vec<Pick> {
        let size = self.size;
        let cells: Vec<Pick> = match selection {
            SelectionState::FreePick => (0..size)
                .flat_map(|column| (0..size).map(move |row| (row, column)))
                .collect(),
            SelectionState::RowPick { column } => (0..size).map(|row| (row, column)).collect(),
            SelectionState::ColumnPick { row } => (0..size).map(|column| (row, column)).collect(),
        };
        cells.into_iter().filter(|&pick| !self.is_used(pick)).collect()
    }

    fn push(&mut self, pick: Pick) {
        let value = self.value(pick);
        self.used[pick.0 + pick.1 * self.size] = true;
        self.values.push(value);
        self.path.push(pick);
    }

    fn pop(&mut self) {
        if let Some((row, column)) = self.path.pop() {
            self.used[row + column * self.size] = false;
            self.values.pop();
        }
    }

    fn follow(&mut self, selection: SelectionState, sequence: &[String]) -> bool {
        let Some(wanted) = sequence.get(self.path.len()) else {
            return true;
        };
        for pick in self.candidates(selection) {
            if self.value(pick) != wanted.as_str() {
                continue;
            }
            let Ok(next) = selection.advance(pick.0, pick.1) else {
                continue;
            };
            self.push(pick);
            if self.follow(next, sequence) {
                return true;
            }
            self.pop();
        }
        false
    }

    fn win(&mut self, selection: SelectionState) -> Step {
        if self.visited >= self.budget {
            return Step::OutOfBudget;
        }
        self.visited += 1;

        let remaining = self
            .config
            .max_buffer_length
            .saturating_sub(self.values.len());

        let config = self.config;
        let mut wanted_next: Vec<&str> = Vec::new();
        let mut all_complete = true;
        for sequence in &config.sequences {
            let have = fulfilled_length(self.values.iter().copied(), sequence);
            if have < sequence.len() {
                all_complete = false;
                // Any completion must reuse at most the live suffix of the buffer.
                if sequence.len() - have > remaining {
                    return Step::DeadEnd;
                }
                wanted_next.push(sequence[have].as_str());
                wanted_next.push(sequence[0].as_str());
            }
        }
        if all_complete && !self.path.is_empty() {
            return Step::Found;
        }

        let mut candidates = self.candidates(selection);
        candidates.sort_by_key(|&pick| !wanted_next.contains(&self.value(pick)));
        for pick in candidates {
            let Ok(next) = selection.advance(pick.0, pick.1) else {
                continue;
            };
            self.push(pick);
            match self.win(next) {
                Step::Found => return Step::Found,
                Step::OutOfBudget => return Step::OutOfBudget,
                Step::DeadEnd => self.pop(),
            }
        }
        Step::DeadEnd
    }
}

/// Picks, starting from a fresh session, whose values spell `sequence` in order.
///
/// # Errors
///
/// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
pub fn find_sequence_path(
    config: &GameConfiguration,
    sequence: &[String],
) -> Result<Option<Vec<Pick>>, BreachError> {
    let mut search = Search::new(config, usize::MAX)?;
    if search.follow(SelectionState::FreePick, sequence) {
        Ok(Some(search.path))
    } else {
        Ok(None)
    }
}

/// Look for a winning pick order, visiting at most `node_budget` positions.
///
/// # Errors
///
/// Returns [`BreachError::InvalidArgument`] if the matrix is not square.
pub fn solve(config: &GameConfiguration, node_budget: usize) -> Result<SolveResult, BreachError> {
    let mut search = Search::new(config, node_budget)?;
    let result = match search.win(SelectionState::FreePick) {
        Step::Found => SolveResult::Solved(search.path),
        Step::DeadEnd => SolveResult::Unsolvable,
        Step::OutOfBudget => SolveResult::BudgetExhausted,
    };
    log::debug!(
        "solver finished after {} nodes: {}",
        search.visited,
        match &result {
            SolveResult::Solved(picks) => format!("solved in {} picks", picks.len()),
            SolveResult::Unsolvable => "unsolvable".to_string(),
            SolveResult::BudgetExhausted => "budget exhausted".to_string(),
        }
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::{BreachSession, SessionOutcome};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn level(sequences: &[&[&str]], max_buffer_length: usize) -> GameConfiguration {
        GameConfiguration::new(
            strings(&["AA", "AA", "BB", "BB", "CC", "AA", "CC", "CC", "CC"]),
            sequences.iter().map(|s| strings(s)).collect(),
            max_buffer_length,
            60_000,
        )
        .unwrap()
    }

    fn replay(config: &GameConfiguration, picks: &[Pick]) -> SessionOutcome {
        let mut session = BreachSession::with_clock(config.clone(), ManualClock::new()).unwrap();
        let mut outcome = session.outcome();
        for &(row, column) in picks {
            outcome = session.pick(row, column).unwrap();
        }
        outcome
    }

    #[test]
    fn sequence_path_respects_alternation() {
        let config = level(&[], 8);
        let sequence = strings(&["AA", "BB", "CC"]);
        let path = find_sequence_path(&config, &sequence).unwrap().unwrap();
        assert_eq!(path.len(), 3);

        let mut selection = SelectionState::FreePick;
        for &(row, column) in &path {
            selection = selection.advance(row, column).unwrap();
        }
        let values: Vec<&str> = path
            .iter()
            .map(|&(row, column)| config.matrix[row + column * 3].as_str())
            .collect();
        assert_eq!(values, ["AA", "BB", "CC"]);
    }

    #[test]
    fn missing_values_have_no_path() {
        let config = level(&[], 8);
        assert_eq!(
            find_sequence_path(&config, &strings(&["AA", "ZZ"])).unwrap(),
            None
        );
        assert_eq!(find_sequence_path(&config, &[]).unwrap(), Some(vec![]));
    }

    #[test]
    fn solution_replays_to_a_win() {
        let config = level(&[&["AA", "BB", "CC"], &["CC", "AA"]], 6);
        let SolveResult::Solved(picks) = solve(&config, DEFAULT_NODE_BUDGET).unwrap() else {
            panic!("level should be solvable");
        };
        assert!(picks.len() <= 6);
        assert_eq!(replay(&config, &picks), SessionOutcome::Won);
    }

    #[test]
    fn tight_buffer_is_unsolvable() {
        let config = level(&[&["AA", "BB", "CC"], &["CC", "CC", "CC"]], 3);
        assert_eq!(
            solve(&config, DEFAULT_NODE_BUDGET).unwrap(),
            SolveResult::Unsolvable
        );
    }

    #[test]
    fn zero_budget_gives_up() {
        let config = level(&[&["AA", "BB"]], 4);
        assert_eq!(solve(&config, 0).unwrap(), SolveResult::BudgetExhausted);
    }
}
