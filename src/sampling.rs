//! Per-example inclusion gate used to subsample very large corpora in one pass.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub struct SamplingGate {
    probability: f64,
    rng: Box<dyn RngCore + Send>,
}

impl SamplingGate {
    /// Gate over a caller-provided random source. `probability` is clamped to `[0, 1]`.
    pub fn new(probability: f64, rng: Box<dyn RngCore + Send>) -> Self {
        let probability = if probability.is_nan() { 0.0 } else { probability.clamp(0.0, 1.0) };
        Self { probability, rng }
    }

    /// Deterministic draws: the same seed over the same example sequence admits the same set.
    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self::new(probability, Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn from_entropy(probability: f64) -> Self {
        Self::new(probability, Box::new(StdRng::from_entropy()))
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// One independent uniform draw in `[0, 1)`; admitted iff `draw < probability`.
    /// With probability 1.0 every example passes, with 0.0 none does.
    pub fn admit(&mut self) -> bool {
        if self.probability >= 1.0 {
            return true;
        }
        if self.probability <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < self.probability
    }
}

impl std::fmt::Debug for SamplingGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplingGate").field("probability", &self.probability).finish()
    }
}
