use anyhow::Result;
use serde::Serialize;

use breach_game::{BreachEngine, GameStorage, SessionOutcome, SolveResult, solve};

/// One level attempted by the headless campaign player.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStep {
    pub level: u32,
    pub outcome: String,
    pub picks: usize,
    pub score: u32,
    pub next_level: u32,
}

/// Play `rounds` levels starting from the saved progress, solving each one
/// and recording the result back into storage.
///
/// Score for a win is the whole seconds left on the countdown.
pub fn run_campaign<S: GameStorage>(
    engine: &BreachEngine<S>,
    seed: &str,
    rounds: usize,
    node_budget: usize,
) -> Result<Vec<CampaignStep>> {
    let mut steps = Vec::with_capacity(rounds);

    for _ in 0..rounds {
        let (save, mut session) = engine.resume(seed)?;
        let level = save.level;

        let mut picks = 0;
        let outcome = match solve(session.configuration(), node_budget)? {
            SolveResult::Solved(path) => {
                let mut outcome = session.outcome();
                for (row, column) in path {
                    outcome = session.pick(row, column)?;
                    picks += 1;
                }
                outcome
            }
            SolveResult::Unsolvable | SolveResult::BudgetExhausted => {
                log::info!("level {level} could not be solved, forfeiting");
                session.expire();
                session.outcome()
            }
        };

        let score = if outcome == SessionOutcome::Won {
            u32::try_from(session.remaining_milliseconds() / 1_000).unwrap_or(u32::MAX)
        } else {
            0
        };
        let updated = engine.record_result(level, outcome, score)?;

        steps.push(CampaignStep {
            level,
            outcome: outcome.to_string(),
            picks,
            score,
            next_level: updated.level,
        });
    }

    Ok(steps)
}
