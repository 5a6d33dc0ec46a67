use anyhow::{Context, Result, bail, ensure};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use breach_game::{
    BreachSession, GameConfiguration, Generator, LevelParams, ManualClock, SessionOutcome,
    find_sequence_path,
};

/// What a check gets to look at: one generated level.
pub struct CheckContext<'a> {
    pub generator: &'a Generator,
    pub level: u32,
    pub seed: &'a str,
    pub config: &'a GameConfiguration,
}

type CheckFn = fn(&CheckContext<'_>) -> Result<()>;

/// A named property every generated level must satisfy.
#[derive(Clone, Copy)]
pub struct LevelCheck {
    pub key: &'static str,
    pub description: &'static str,
    run: CheckFn,
}

impl LevelCheck {
    pub fn evaluate(&self, ctx: &CheckContext<'_>) -> Result<()> {
        (self.run)(ctx)
    }
}

pub fn catalog_checks() -> Vec<LevelCheck> {
    vec![
        LevelCheck {
            key: "determinism",
            description: "Same level and seed always produce the same configuration",
            run: determinism_check,
        },
        LevelCheck {
            key: "shape",
            description: "Matrix, sequences and buffer follow the difficulty curve",
            run: shape_check,
        },
        LevelCheck {
            key: "realizability",
            description: "Every sequence can be entered under the alternation rule",
            run: realizability_check,
        },
        LevelCheck {
            key: "session-replay",
            description: "Entering a sequence in a live session completes it",
            run: session_replay_check,
        },
    ]
}

pub fn find_check(key: &str) -> Option<LevelCheck> {
    catalog_checks().into_iter().find(|check| check.key == key)
}

fn determinism_check(ctx: &CheckContext<'_>) -> Result<()> {
    let again = ctx.generator.generate(ctx.level, ctx.seed)?;
    ensure!(
        again.fingerprint() == ctx.config.fingerprint(),
        "Regenerating level {} changed its fingerprint",
        ctx.level
    );
    let fresh = Generator::new(ctx.generator.config().clone())?.generate(ctx.level, ctx.seed)?;
    ensure!(
        &fresh == ctx.config,
        "A fresh generator disagreed on level {}",
        ctx.level
    );
    Ok(())
}

fn shape_check(ctx: &CheckContext<'_>) -> Result<()> {
    let tuning = ctx.generator.config();
    let params = LevelParams::for_level(tuning, ctx.level)?;
    let config = ctx.config;

    let size = config.size()?;
    let expected = params.matrix_size;
    ensure!(
        size == expected,
        "Matrix is {size}x{size}, expected {expected}x{expected}"
    );
    ensure!(
        config.sequences.len() == params.number_of_sequences,
        "Expected {} sequences, found {}",
        params.number_of_sequences,
        config.sequences.len()
    );
    ensure!(
        config.max_buffer_length == params.max_buffer_length,
        "Buffer cap {} differs from {}",
        config.max_buffer_length,
        params.max_buffer_length
    );
    ensure!(
        config.timeout_milliseconds == params.timeout_milliseconds,
        "Timeout {}ms differs from {}ms",
        config.timeout_milliseconds,
        params.timeout_milliseconds
    );
    if let Some(stray) = config.matrix.iter().find(|v| !tuning.symbols.contains(v)) {
        bail!("Matrix value {stray} is not in the symbol pool");
    }
    for (i, sequence) in config.sequences.iter().enumerate() {
        ensure!(
            (tuning.min_sequence_length..=config.max_buffer_length).contains(&sequence.len()),
            "Sequence {i} has length {} outside {}..={}",
            sequence.len(),
            tuning.min_sequence_length,
            config.max_buffer_length
        );
    }
    Ok(())
}

fn realizability_check(ctx: &CheckContext<'_>) -> Result<()> {
    for (i, sequence) in ctx.config.sequences.iter().enumerate() {
        let path = find_sequence_path(ctx.config, sequence)?;
        ensure!(
            path.is_some(),
            "Sequence {i} {sequence:?} has no legal pick path"
        );
    }
    Ok(())
}

fn session_replay_check(ctx: &CheckContext<'_>) -> Result<()> {
    for (i, sequence) in ctx.config.sequences.iter().enumerate() {
        let path = find_sequence_path(ctx.config, sequence)?
            .with_context(|| format!("Sequence {i} has no legal pick path"))?;
        let single = GameConfiguration {
            sequences: vec![sequence.clone()],
            max_buffer_length: sequence.len(),
            ..ctx.config.clone()
        };
        let mut session = BreachSession::with_clock(single, ManualClock::new())?;
        let mut outcome = session.outcome();
        for (row, column) in path {
            outcome = session.pick(row, column)?;
        }
        ensure!(
            outcome == SessionOutcome::Won,
            "Entering sequence {i} ended {outcome} instead of won"
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub seed: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

/// Runs level checks over a set of levels for each seed.
pub struct LogicTester {
    generator: Generator,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(generator: Generator, verbose: bool) -> Self {
        Self { generator, verbose }
    }

    pub fn run_check(
        &self,
        check: &LevelCheck,
        levels: &[u32],
        seeds: &[String],
    ) -> Vec<CheckResult> {
        seeds
            .iter()
            .map(|seed| {
                if self.verbose {
                    println!(
                        "🧪 Checking: {} (seed: {seed})",
                        check.key.bright_white()
                    );
                }
                self.run_single_check(check, levels, seed)
            })
            .collect()
    }

    fn run_single_check(&self, check: &LevelCheck, levels: &[u32], seed: &str) -> CheckResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut total = Duration::ZERO;

        for &level in levels {
            let start = Instant::now();
            let outcome = self
                .generator
                .generate(level, seed)
                .map_err(anyhow::Error::from)
                .and_then(|config| {
                    check.evaluate(&CheckContext {
                        generator: &self.generator,
                        level,
                        seed,
                        config: &config,
                    })
                });
            total += start.elapsed();

            match outcome {
                Ok(()) => successes += 1,
                Err(err) => {
                    log::warn!("{} failed on level {level} seed {seed}: {err:#}", check.key);
                    if self.verbose {
                        println!("  ❌ Level {level} failed: {}", format!("{err:#}").red());
                    }
                    failures.push(format!("Level {level}: {err:#}"));
                }
            }
        }

        CheckResult {
            check_name: check.key.to_string(),
            seed: seed.to_string(),
            passed: failures.is_empty(),
            iterations_run: levels.len(),
            successful_iterations: successes,
            failures,
            average_duration: total / u32::try_from(levels.len().max(1)).unwrap_or(u32::MAX),
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keys_are_unique() {
        let checks = catalog_checks();
        for check in &checks {
            assert_eq!(find_check(check.key).map(|c| c.key), Some(check.key));
        }
        assert!(find_check("nope").is_none());
    }

    #[test]
    fn default_generator_passes_every_check() {
        let tester = LogicTester::new(Generator::default(), false);
        let levels: Vec<u32> = vec![1, 9, 24, 61, 90];
        for check in catalog_checks() {
            let results = tester.run_check(&check, &levels, &["Testseed".to_string()]);
            assert_eq!(results.len(), 1);
            let result = &results[0];
            assert!(result.passed, "{}: {:?}", check.key, result.failures);
            assert_eq!(result.successful_iterations, levels.len());
        }
    }

    #[test]
    fn shape_check_flags_tampered_levels() {
        let generator = Generator::default();
        let mut config = generator.generate(5, "tamper").unwrap();
        config.matrix[0] = "ZZ".to_string();
        let ctx = CheckContext {
            generator: &generator,
            level: 5,
            seed: "tamper",
            config: &config,
        };
        let err = shape_check(&ctx).unwrap_err();
        assert!(err.to_string().contains("ZZ"));
        assert!(determinism_check(&ctx).is_err());
    }

    #[test]
    fn results_serialize_durations_as_micros() {
        let result = CheckResult {
            check_name: "shape".to_string(),
            seed: "s".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: vec![],
            average_duration: Duration::from_millis(3),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 3_000);
    }
}
