use breach_game::{
    BreachError, BreachSession, GameConfiguration, Generator, GeneratorConfig, LevelParams,
    ManualClock, SessionOutcome, find_sequence_path, generate,
};
use std::collections::HashSet;

const SEEDS: [&str; 4] = ["Testseed", "alpha", "", "breach-2077"];

#[test]
fn every_generated_sequence_can_be_entered() {
    for seed in SEEDS {
        for level in (1..=120).step_by(7) {
            let config = generate(level, seed).unwrap();
            for sequence in &config.sequences {
                let path = find_sequence_path(&config, sequence).unwrap();
                assert!(
                    path.is_some(),
                    "level {level} seed {seed:?}: {sequence:?} has no legal path"
                );
            }
        }
    }
}

#[test]
fn entering_a_generated_sequence_completes_it() {
    let config = generate(14, "entry").unwrap();
    let target = config.sequences[0].clone();
    let path = find_sequence_path(&config, &target).unwrap().unwrap();

    let single = GameConfiguration {
        sequences: vec![target.clone()],
        max_buffer_length: target.len(),
        ..config
    };
    let mut session = BreachSession::with_clock(single, ManualClock::new()).unwrap();
    let mut outcome = session.outcome();
    for (row, column) in path {
        outcome = session.pick(row, column).unwrap();
    }
    assert_eq!(outcome, SessionOutcome::Won);
    assert!(session.get_sequences()[0].is_complete());
}

#[test]
fn generation_is_a_pure_function_of_level_and_seed() {
    let fingerprints: HashSet<u64> = (0..5)
        .map(|_| generate(33, "Testseed").unwrap().fingerprint())
        .collect();
    assert_eq!(fingerprints.len(), 1);

    let distinct: HashSet<u64> = (1..=20)
        .map(|i| generate(33, &format!("seed-{i}")).unwrap().fingerprint())
        .collect();
    assert!(distinct.len() > 15);
}

#[test]
fn level_zero_is_invalid_for_any_seed() {
    for seed in SEEDS {
        assert!(matches!(
            generate(0, seed),
            Err(BreachError::InvalidArgument(_))
        ));
    }
}

#[test]
fn custom_tuning_changes_the_curve() {
    let config = GeneratorConfig::from_json(
        r#"{
            "min_matrix_size": 5,
            "max_matrix_size": 6,
            "timeout_milliseconds": 15000,
            "symbols": ["X1", "Y2"]
        }"#,
    )
    .unwrap();
    let generator = Generator::new(config.clone()).unwrap();

    let level = generator.generate(1, "custom").unwrap();
    let params = LevelParams::for_level(&config, 1).unwrap();
    assert_eq!(level.size().unwrap(), 5);
    assert_eq!(params.matrix_size, 5);
    assert_eq!(level.timeout_milliseconds, 15_000);
    assert!(level.matrix.iter().all(|v| v == "X1" || v == "Y2"));
    assert_eq!(generator.generate(200, "custom").unwrap().size().unwrap(), 6);
}

#[test]
fn generated_levels_start_fresh_sessions() {
    let config = generate(40, "fresh").unwrap();
    let session = BreachSession::with_clock(config.clone(), ManualClock::new()).unwrap();
    assert_eq!(session.size(), config.size().unwrap());
    assert!(session.buffer().is_empty());
    assert!(session.get_sequences().iter().all(|p| p.number_of_fulfilled == 0));
    assert_eq!(session.remaining_milliseconds(), config.timeout_milliseconds);
}
