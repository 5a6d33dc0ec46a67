//! Seeded random source for level generation.
//!
//! Any string seeds the generator. The seed text is hashed with SHA-256 and
//! the digest keys a ChaCha20 stream, so equal seeds always replay the same
//! draws on every platform.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

const SEED_DOMAIN: &[u8] = b"BREACH-LEVEL-";

/// Float source in `[0, 1)` derived from a text seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    inner: ChaCha20Rng,
}

impl SeededRng {
    #[must_use]
    pub fn from_seed_str(seed: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(SEED_DOMAIN);
        hasher.update(seed.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Self {
            inner: ChaCha20Rng::from_seed(digest),
        }
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.inner.r#gen::<f64>()
    }

    /// Integer in `[min, max]`, both inclusive, scaled from one float draw.
    pub fn int_inclusive(&mut self, min: usize, max: usize) -> usize {
        debug_assert!(min <= max, "empty range {min}..={max}");
        let span = max - min + 1;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let offset = (self.next_f64() * span as f64) as usize;
        min + offset.min(span - 1)
    }
}
