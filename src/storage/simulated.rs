//! Simulated Storage with Fault Injection
//!
//! DST-compatible wrapper that fails operations with configured probabilities,
//! drawn from a seeded RNG so a failing run can be replayed exactly.

use super::{Storage, StorageError};
use crate::simulator::DeterministicRng;
use parking_lot::Mutex;
use std::sync::Arc;

/// Configuration for simulated fault injection
#[derive(Debug, Clone)]
pub struct SimulatedStorageConfig {
    /// Probability of `save_info` failure
    pub save_info_fail_prob: f64,
    /// Probability of `save_data` failure
    pub save_data_fail_prob: f64,
    /// Probability of `load_info` / `load_data` failure
    pub load_fail_prob: f64,
    /// Probability of `create` / `delete` failure
    pub admin_fail_prob: f64,
}

impl Default for SimulatedStorageConfig {
    fn default() -> Self {
        SimulatedStorageConfig {
            save_info_fail_prob: 0.05, // 5%
            save_data_fail_prob: 0.05, // 5%
            load_fail_prob: 0.01,      // 1%
            admin_fail_prob: 0.01,     // 1%
        }
    }
}

impl SimulatedStorageConfig {
    /// High chaos configuration for stress testing
    pub fn high_chaos() -> Self {
        SimulatedStorageConfig {
            save_info_fail_prob: 0.3,
            save_data_fail_prob: 0.3,
            load_fail_prob: 0.05,
            admin_fail_prob: 0.05,
        }
    }

    /// No faults - for baseline testing
    pub fn no_faults() -> Self {
        SimulatedStorageConfig {
            save_info_fail_prob: 0.0,
            save_data_fail_prob: 0.0,
            load_fail_prob: 0.0,
            admin_fail_prob: 0.0,
        }
    }

    /// Every write fails, reads succeed
    pub fn failing_writes() -> Self {
        SimulatedStorageConfig {
            save_info_fail_prob: 1.0,
            save_data_fail_prob: 1.0,
            ..Self::no_faults()
        }
    }
}

/// Statistics for fault injection
#[derive(Debug, Clone, Default)]
pub struct SimulatedStorageStats {
    pub save_info_attempts: u64,
    pub save_info_failures: u64,
    pub save_data_attempts: u64,
    pub save_data_failures: u64,
    pub load_attempts: u64,
    pub load_failures: u64,
    pub admin_attempts: u64,
    pub admin_failures: u64,
}

struct SimulatedStorageInner {
    rng: DeterministicRng,
    config: SimulatedStorageConfig,
    stats: SimulatedStorageStats,
}

/// Storage wrapper that injects faults before delegating to the inner store
///
/// A failed write never reaches the inner store, so the previous record
/// survives untouched.
pub struct SimulatedStorage<S: Storage> {
    inner_store: S,
    state: Arc<Mutex<SimulatedStorageInner>>,
}

impl<S: Storage> SimulatedStorage<S> {
    pub fn new(inner_store: S, rng: DeterministicRng, config: SimulatedStorageConfig) -> Self {
        SimulatedStorage {
            inner_store,
            state: Arc::new(Mutex::new(SimulatedStorageInner {
                rng,
                config,
                stats: SimulatedStorageStats::default(),
            })),
        }
    }

    /// Get current statistics
    pub fn stats(&self) -> SimulatedStorageStats {
        self.state.lock().stats.clone()
    }

    /// Swap fault probabilities mid-run
    pub fn set_config(&self, config: SimulatedStorageConfig) {
        self.state.lock().config = config;
    }

    /// The wrapped store, bypassing fault injection
    pub fn inner(&self) -> &S {
        &self.inner_store
    }

    fn should_fail(&self, op: Op) -> bool {
        let mut state = self.state.lock();
        let prob = match op {
            Op::SaveInfo => state.config.save_info_fail_prob,
            Op::SaveData => state.config.save_data_fail_prob,
            Op::Load => state.config.load_fail_prob,
            Op::Admin => state.config.admin_fail_prob,
        };
        let fail = state.rng.gen_bool(prob);

        let stats = &mut state.stats;
        let (attempts, failures) = match op {
            Op::SaveInfo => (&mut stats.save_info_attempts, &mut stats.save_info_failures),
            Op::SaveData => (&mut stats.save_data_attempts, &mut stats.save_data_failures),
            Op::Load => (&mut stats.load_attempts, &mut stats.load_failures),
            Op::Admin => (&mut stats.admin_attempts, &mut stats.admin_failures),
        };
        *attempts += 1;
        if fail {
            *failures += 1;
        }
        fail
    }
}

impl<S: Storage + Clone> Clone for SimulatedStorage<S> {
    fn clone(&self) -> Self {
        SimulatedStorage {
            inner_store: self.inner_store.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    SaveInfo,
    SaveData,
    Load,
    Admin,
}

impl<S: Storage> Storage for SimulatedStorage<S> {
    fn create(&self, id: &str) -> Result<(), StorageError> {
        if self.should_fail(Op::Admin) {
            return Err(StorageError::Injected("create"));
        }
        self.inner_store.create(id)
    }

    fn save_info(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.should_fail(Op::SaveInfo) {
            return Err(StorageError::Injected("save_info"));
        }
        self.inner_store.save_info(id, data)
    }

    fn load_info(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        if self.should_fail(Op::Load) {
            return Err(StorageError::Injected("load_info"));
        }
        self.inner_store.load_info(id)
    }

    fn save_data(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.should_fail(Op::SaveData) {
            return Err(StorageError::Injected("save_data"));
        }
        self.inner_store.save_data(id, data)
    }

    fn load_data(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self.should_fail(Op::Load) {
            return Err(StorageError::Injected("load_data"));
        }
        self.inner_store.load_data(id)
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        if self.should_fail(Op::Admin) {
            return Err(StorageError::Injected("delete"));
        }
        self.inner_store.delete(id)
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        if self.should_fail(Op::Load) {
            return Err(StorageError::Injected("list"));
        }
        self.inner_store.list()
    }
}
