use anyhow::{Result, bail};
use std::collections::HashSet;

/// Seed words used when `all` is requested.
pub const SEED_WORDS: &[&str] = &[
    "Testseed", "arasaka", "blackwall", "daemon", "ghost", "icebreaker", "kiroshi", "netrunner",
    "protocol", "relic", "sandevistan", "militech",
];

const DEFAULT_SEED: &str = "Testseed";

/// A seed string plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: String,
    pub from_word_list: bool,
}

impl SeedInfo {
    #[must_use]
    pub fn literal(seed: &str) -> Self {
        Self {
            seed: seed.to_string(),
            from_word_list: false,
        }
    }

    /// Seeds for each iteration: the seed itself, then `seed#1`, `seed#2`, ...
    #[must_use]
    pub fn iteration_seeds(&self, iterations: usize) -> Vec<String> {
        (0..iterations.max(1))
            .map(|i| {
                if i == 0 {
                    self.seed.clone()
                } else {
                    format!("{}#{i}", self.seed)
                }
            })
            .collect()
    }
}

/// Resolve CLI seed tokens into seeds, keeping first-seen order.
///
/// Any text is a valid seed. The keywords `all` / `available` expand to the
/// built-in word list. Falls back to a single default seed when nothing is given.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        if token.eq_ignore_ascii_case("all") || token.eq_ignore_ascii_case("available") {
            pending.extend(SEED_WORDS.iter().map(|word| SeedInfo {
                seed: (*word).to_string(),
                from_word_list: true,
            }));
            continue;
        }
        if token.contains('#') {
            bail!("Seed token {token} may not contain '#', it is reserved for iterations");
        }
        pending.push(SeedInfo::literal(token));
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed.clone()))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::literal(DEFAULT_SEED));
    }

    Ok(deduped)
}
