//! Seeded randomness for the simulation harness and fault-injecting storage.
//!
//! A thin wrapper over `ChaCha8Rng` so a failing seed replays the same
//! workload and the same storage faults on every platform.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        DeterministicRng {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Raw draw, used to derive seeds for domains under test
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Child stream for a second consumer (the storage wrapper), so its
    /// draws don't shift the workload's
    pub fn fork(&mut self) -> Self {
        DeterministicRng::new(self.next_u64())
    }

    /// Uniform draw from `range`; an empty range yields its start
    pub fn gen_range(&mut self, range: Range<u64>) -> u64 {
        if range.is_empty() {
            return range.start;
        }
        self.rng.gen_range(range)
    }

    /// True with `probability`, clamped to [0, 1]
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
