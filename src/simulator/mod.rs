//! Deterministic simulation support
//!
//! Seed-driven randomness shared by fault-injecting storage and the domain
//! simulation harness. Given the same seed, every run makes the same choices.

mod rng;

pub use rng::DeterministicRng;
