use anyhow::{Result, ensure};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use breach_game::{
    BreachSession, Generator, LevelParams, ManualClock, SessionOutcome, SolveResult, solve,
};

/// Solver verdict for one generated level.
#[derive(Debug, Clone, Serialize)]
pub struct PlayabilityRecord {
    pub level: u32,
    pub seed: String,
    pub matrix_size: usize,
    pub sequences: usize,
    pub max_buffer_length: usize,
    pub fingerprint: String,
    pub verdict: Verdict,
    pub picks: Option<usize>,
    pub replay_won: bool,
    pub solve_micros: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Solved,
    Unsolvable,
    BudgetExhausted,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::Unsolvable => "unsolvable",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

/// Per-level roll-up across seeds.
#[derive(Debug, Clone, Serialize)]
pub struct PlayabilityAggregate {
    pub level: u32,
    pub matrix_size: usize,
    pub sequences: usize,
    pub max_buffer_length: usize,
    pub runs: usize,
    pub solved_pct: f64,
    pub unsolvable_pct: f64,
    pub exhausted_pct: f64,
    pub mean_picks: f64,
    pub std_picks: f64,
}

pub fn run_playability_analysis(
    generator: &Generator,
    levels: &[u32],
    seeds: &[String],
    node_budget: usize,
) -> Result<Vec<PlayabilityRecord>> {
    let mut records = Vec::with_capacity(levels.len() * seeds.len());

    for &level in levels {
        for seed in seeds {
            let config = generator.generate(level, seed)?;
            let start = Instant::now();
            let result = solve(&config, node_budget)?;
            let solve_micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

            let (verdict, picks, replay_won) = match &result {
                SolveResult::Solved(picks) => {
                    let mut session = BreachSession::with_clock(config.clone(), ManualClock::new())?;
                    let mut outcome = session.outcome();
                    for &(row, column) in picks {
                        outcome = session.pick(row, column)?;
                    }
                    (
                        Verdict::Solved,
                        Some(picks.len()),
                        outcome == SessionOutcome::Won,
                    )
                }
                SolveResult::Unsolvable => (Verdict::Unsolvable, None, false),
                SolveResult::BudgetExhausted => (Verdict::BudgetExhausted, None, false),
            };
            log::debug!("level {level} seed {seed}: {}", verdict.label());

            records.push(PlayabilityRecord {
                level,
                seed: seed.clone(),
                matrix_size: config.size()?,
                sequences: config.sequences.len(),
                max_buffer_length: config.max_buffer_length,
                fingerprint: format!("{:016x}", config.fingerprint()),
                verdict,
                picks,
                replay_won,
                solve_micros,
            });
        }
    }

    Ok(records)
}

pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut aggregates: BTreeMap<u32, AggregateBuilder> = BTreeMap::new();
    for record in records {
        aggregates
            .entry(record.level)
            .or_insert_with(|| AggregateBuilder::new(record))
            .ingest(record);
    }
    aggregates
        .into_values()
        .map(AggregateBuilder::finish)
        .collect()
}

/// Fail the run when a solver answer does not hold up in a real session,
/// or when the record disagrees with the difficulty curve.
pub fn validate_playability_targets(
    generator: &Generator,
    records: &[PlayabilityRecord],
) -> Result<()> {
    for record in records {
        ensure!(
            record.verdict != Verdict::Solved || record.replay_won,
            "Solver path for level {} seed {} did not win when replayed",
            record.level,
            record.seed
        );
        let params = LevelParams::for_level(generator.config(), record.level)?;
        ensure!(
            record.matrix_size == params.matrix_size
                && record.sequences == params.number_of_sequences,
            "Level {} seed {} does not match its difficulty parameters",
            record.level,
            record.seed
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    level: u32,
    matrix_size: usize,
    sequences: usize,
    max_buffer_length: usize,
    runs: u32,
    solved: u32,
    unsolvable: u32,
    exhausted: u32,
    picks: RunningStats,
}

impl AggregateBuilder {
    fn new(record: &PlayabilityRecord) -> Self {
        Self {
            level: record.level,
            matrix_size: record.matrix_size,
            sequences: record.sequences,
            max_buffer_length: record.max_buffer_length,
            runs: 0,
            solved: 0,
            unsolvable: 0,
            exhausted: 0,
            picks: RunningStats::default(),
        }
    }

    fn ingest(&mut self, record: &PlayabilityRecord) {
        self.runs += 1;
        match record.verdict {
            Verdict::Solved => self.solved += 1,
            Verdict::Unsolvable => self.unsolvable += 1,
            Verdict::BudgetExhausted => self.exhausted += 1,
        }
        if let Some(picks) = record.picks {
            self.picks.add(f64::from(u32::try_from(picks).unwrap_or(u32::MAX)));
        }
    }

    fn finish(self) -> PlayabilityAggregate {
        let denom = f64::from(self.runs.max(1));
        PlayabilityAggregate {
            level: self.level,
            matrix_size: self.matrix_size,
            sequences: self.sequences,
            max_buffer_length: self.max_buffer_length,
            runs: usize::try_from(self.runs).unwrap_or(usize::MAX),
            solved_pct: f64::from(self.solved) / denom,
            unsolvable_pct: f64::from(self.unsolvable) / denom,
            exhausted_pct: f64::from(self.exhausted) / denom,
            mean_picks: self.picks.mean(),
            std_picks: self.picks.std_dev(),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / f64::from(self.count);
        self.m2 += delta * (value - self.mean);
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / f64::from(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}
