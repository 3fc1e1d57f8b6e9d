//! Frequency Domain Deterministic Simulation Testing Harness
//!
//! Drives a `FrequencyDomain` over `SimulatedStorage` with a seeded workload
//! and checks, after every step:
//!
//! - **Exact total**: `get_count` equals the number of events added since the
//!   last clear, whether or not the save that followed succeeded
//! - **Monotone estimates**: between clears, no key's estimate decreases
//! - **Clear empties**: after a clear every estimate is 0
//! - **Remove rejected**: remove fails with `UnsupportedOperation` and
//!   changes nothing
//! - **Acknowledged durability**: once a save-bearing call returns `Ok`, the
//!   stored info record carries the current count
//!
//! and finally that a domain reloaded from storage after a fault-free flush
//! reports the same count and the same estimates.

use super::{
    Counter, DomainError, DomainOptions, DomainType, FrequencyDomain, Info, SavePolicy,
};
use crate::simulator::DeterministicRng;
use crate::storage::{
    InMemoryStorage, SimulatedStorage, SimulatedStorageConfig, SimulatedStorageStats, Storage,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of a single DST run
#[derive(Debug)]
pub struct FrequencyDSTResult {
    pub seed: u64,
    pub operations: usize,
    pub acknowledged_saves: usize,
    pub failed_saves: usize,
    pub clears: usize,
    pub final_count: u64,
    pub store_stats: SimulatedStorageStats,
    pub passed: bool,
    pub error_message: Option<String>,
}

/// Configuration for the frequency domain DST harness
#[derive(Debug, Clone)]
pub struct FrequencyDSTConfig {
    /// Operations per run
    pub num_operations: usize,
    /// Number of distinct keys in the workload
    pub key_space: u64,
    pub epsilon: f64,
    pub delta: f64,
    pub save_policy: SavePolicy,
    /// Fault injection config, applied after the domain is created
    pub store_config: SimulatedStorageConfig,
}

impl Default for FrequencyDSTConfig {
    fn default() -> Self {
        FrequencyDSTConfig {
            num_operations: 300,
            key_space: 40,
            epsilon: 0.01, // Small sketch keeps per-save snapshots cheap
            delta: 0.1,
            save_policy: SavePolicy::EveryMutation,
            store_config: SimulatedStorageConfig::default(),
        }
    }
}

impl FrequencyDSTConfig {
    /// No faults - baseline correctness
    pub fn baseline() -> Self {
        FrequencyDSTConfig {
            store_config: SimulatedStorageConfig::no_faults(),
            ..Default::default()
        }
    }

    /// Heavy write failures
    pub fn chaos() -> Self {
        FrequencyDSTConfig {
            store_config: SimulatedStorageConfig::high_chaos(),
            ..Default::default()
        }
    }

    /// Mutations never save on their own; only flush/save reach storage
    pub fn deferred() -> Self {
        FrequencyDSTConfig {
            save_policy: SavePolicy::Threshold(Duration::from_secs(3600)),
            ..Default::default()
        }
    }
}

/// Frequency domain DST harness
pub struct FrequencyDSTHarness {
    seed: u64,
    rng: DeterministicRng,
    config: FrequencyDSTConfig,
    id: String,
    /// Exact events per key since the last clear
    shadow: HashMap<String, u64>,
    shadow_total: u64,
    last_estimates: HashMap<String, u64>,
    operations: usize,
    acknowledged_saves: usize,
    failed_saves: usize,
    clears: usize,
}

impl FrequencyDSTHarness {
    pub fn new(seed: u64, config: FrequencyDSTConfig) -> Self {
        FrequencyDSTHarness {
            seed,
            rng: DeterministicRng::new(seed),
            config,
            id: format!("dst-{}", seed),
            shadow: HashMap::new(),
            shadow_total: 0,
            last_estimates: HashMap::new(),
            operations: 0,
            acknowledged_saves: 0,
            failed_saves: 0,
            clears: 0,
        }
    }

    /// Run a single DST scenario
    pub fn run(&mut self) -> FrequencyDSTResult {
        let store = SimulatedStorage::new(
            InMemoryStorage::new(),
            self.rng.fork(),
            SimulatedStorageConfig::no_faults(),
        );
        let outcome = self.execute(&store);

        FrequencyDSTResult {
            seed: self.seed,
            operations: self.operations,
            acknowledged_saves: self.acknowledged_saves,
            failed_saves: self.failed_saves,
            clears: self.clears,
            final_count: self.shadow_total,
            store_stats: store.stats(),
            passed: outcome.is_ok(),
            error_message: outcome.err(),
        }
    }

    fn execute(&mut self, store: &SimulatedStorage<InMemoryStorage>) -> Result<(), String> {
        let options = DomainOptions {
            epsilon: self.config.epsilon,
            delta: self.config.delta,
            save_policy: self.config.save_policy,
            seed: Some(self.rng.next_u64()),
        };

        // Setup runs fault-free; faults start with the workload
        let domain = FrequencyDomain::create(
            Info::new(self.id.clone(), DomainType::Frequency),
            Arc::new(store.clone()),
            options.clone(),
        )
        .map_err(|e| format!("Failed to create domain: {}", e))?;
        store.set_config(self.config.store_config.clone());

        for _ in 0..self.config.num_operations {
            self.operations += 1;
            self.step(&domain, store)?;
            if domain.get_count() != self.shadow_total {
                return Err(format!(
                    "INVARIANT VIOLATION at op {}: count {} != expected {}",
                    self.operations,
                    domain.get_count(),
                    self.shadow_total
                ));
            }
        }

        // Recovery: fault-free flush, then reload from the raw store
        store.set_config(SimulatedStorageConfig::no_faults());
        domain
            .flush()
            .map_err(|e| format!("Fault-free flush failed: {}", e))?;
        let recovered = FrequencyDomain::load(&self.id, Arc::new(store.inner().clone()), options)
            .map_err(|e| format!("Reload failed: {}", e))?;

        if recovered.get_count() != self.shadow_total {
            return Err(format!(
                "INVARIANT VIOLATION: reloaded count {} != expected {}",
                recovered.get_count(),
                self.shadow_total
            ));
        }
        let keys = self.all_keys();
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
        let live = estimates(&domain, &key_refs)?;
        let reloaded = estimates(&recovered, &key_refs)?;
        if live != reloaded {
            return Err("INVARIANT VIOLATION: reloaded estimates differ from live domain".into());
        }
        Ok(())
    }

    fn step(
        &mut self,
        domain: &FrequencyDomain,
        store: &SimulatedStorage<InMemoryStorage>,
    ) -> Result<(), String> {
        let mutations_save = self.config.save_policy == SavePolicy::EveryMutation;
        let roll = self.rng.gen_range(0..100);
        match roll {
            0..=54 => {
                let key = self.pick_key();
                let result = domain.add(key.as_bytes());
                self.record_events(std::slice::from_ref(&key));
                self.after_save(result.map(|_| ()), mutations_save, store)
            }
            55..=74 => {
                let batch = self.pick_batch();
                let refs: Vec<&[u8]> = batch.iter().map(|k| k.as_bytes()).collect();
                let result = domain.add_multiple(&refs);
                self.record_events(&batch);
                self.after_save(result.map(|_| ()), mutations_save, store)
            }
            75..=84 => self.check_estimates(domain),
            85..=87 => {
                let key = self.pick_key();
                match domain.remove(key.as_bytes()) {
                    Err(DomainError::UnsupportedOperation { .. }) => Ok(()),
                    other => Err(format!(
                        "INVARIANT VIOLATION: remove returned {:?}",
                        other.map_err(|e| e.to_string())
                    )),
                }
            }
            88..=89 => {
                let result = domain.clear();
                self.shadow.clear();
                self.shadow_total = 0;
                self.last_estimates.clear();
                self.clears += 1;
                // clear saves in full under every policy
                self.after_save(result.map(|_| ()), true, store)?;

                let keys = self.all_keys();
                let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
                if let Some((key, estimate)) = estimates(domain, &key_refs)?
                    .into_iter()
                    .find(|(_, estimate)| *estimate != 0)
                {
                    return Err(format!(
                        "INVARIANT VIOLATION: {} estimated at {} after clear",
                        key, estimate
                    ));
                }
                Ok(())
            }
            90..=94 => {
                let result = domain.flush();
                self.after_save(result, true, store)
            }
            _ => {
                let result = domain.save();
                self.after_save(result, true, store)
            }
        }
    }

    fn pick_key(&mut self) -> String {
        format!("key-{:04}", self.rng.gen_range(0..self.config.key_space))
    }

    /// 1..=8 distinct keys in random order
    fn pick_batch(&mut self) -> Vec<String> {
        let mut keys = self.all_keys();
        self.rng.shuffle(&mut keys);
        let len = self.rng.gen_range(1..9) as usize;
        keys.truncate(len);
        keys
    }

    fn all_keys(&self) -> Vec<String> {
        (0..self.config.key_space)
            .map(|i| format!("key-{:04}", i))
            .collect()
    }

    fn record_events(&mut self, keys: &[String]) {
        for key in keys {
            *self.shadow.entry(key.clone()).or_insert(0) += 1;
            self.shadow_total += 1;
        }
    }

    /// `durable`: whether an `Ok` result promises the record reached storage
    fn after_save(
        &mut self,
        result: Result<(), DomainError>,
        durable: bool,
        store: &SimulatedStorage<InMemoryStorage>,
    ) -> Result<(), String> {
        match result {
            Ok(()) if !durable => Ok(()),
            Ok(()) => {
                self.acknowledged_saves += 1;
                let bytes = store
                    .inner()
                    .load_info(&self.id)
                    .map_err(|e| format!("Acknowledged info record missing: {}", e))?;
                let persisted = Info::from_json(&bytes).map_err(|e| e.to_string())?.count();
                if persisted != Some(self.shadow_total) {
                    return Err(format!(
                        "INVARIANT VIOLATION: acknowledged save persisted {:?}, expected {}",
                        persisted, self.shadow_total
                    ));
                }
                Ok(())
            }
            Err(DomainError::StorageWrite(_)) => {
                self.failed_saves += 1;
                Ok(())
            }
            Err(e) => Err(format!("Unexpected error: {}", e)),
        }
    }

    fn check_estimates(&mut self, domain: &FrequencyDomain) -> Result<(), String> {
        let keys: Vec<String> = self.shadow.keys().cloned().collect();
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
        for (key, estimate) in estimates(domain, &key_refs)? {
            let previous = self.last_estimates.get(&key).copied().unwrap_or(0);
            if estimate < previous {
                return Err(format!(
                    "INVARIANT VIOLATION: estimate for {} fell from {} to {}",
                    key, previous, estimate
                ));
            }
            self.last_estimates.insert(key, estimate);
        }
        Ok(())
    }
}

/// Harness keys are ASCII, so the byte keys convert back losslessly
fn estimates(domain: &FrequencyDomain, keys: &[&[u8]]) -> Result<HashMap<String, u64>, String> {
    let frequencies = domain
        .get_frequency(keys)
        .map_err(|e| format!("get_frequency failed: {}", e))?;
    Ok(frequencies
        .into_iter()
        .map(|(key, estimate)| (String::from_utf8_lossy(&key).into_owned(), estimate))
        .collect())
}

/// Run a batch of DST tests across multiple seeds
pub fn run_frequency_dst_batch(
    seeds: std::ops::Range<u64>,
    config: FrequencyDSTConfig,
) -> Vec<FrequencyDSTResult> {
    seeds
        .map(|seed| {
            let mut harness = FrequencyDSTHarness::new(seed, config.clone());
            harness.run()
        })
        .collect()
}

/// Summarize batch results
pub fn summarize_frequency_dst_batch(results: &[FrequencyDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    let total_ops: usize = results.iter().map(|r| r.operations).sum();
    let total_acked: usize = results.iter().map(|r| r.acknowledged_saves).sum();
    let total_failed_saves: usize = results.iter().map(|r| r.failed_saves).sum();

    let mut summary = format!(
        "Frequency DST Batch: {}/{} passed ({} failed)\n\
         Operations: {}, Acknowledged saves: {}, Failed saves: {}",
        passed, total, failed, total_ops, total_acked, total_failed_saves
    );

    if failed > 0 {
        summary.push_str("\n\nFailed seeds:");
        for r in results.iter().filter(|r| !r.passed) {
            summary.push_str(&format!(
                "\n  Seed {}: {}",
                r.seed,
                r.error_message.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_dst_baseline() {
        let results = run_frequency_dst_batch(0..5, FrequencyDSTConfig::baseline());
        for r in &results {
            assert!(r.passed, "Seed {} failed: {:?}", r.seed, r.error_message);
            assert_eq!(r.failed_saves, 0);
            assert!(r.acknowledged_saves > 0);
        }
    }

    #[test]
    fn test_frequency_dst_same_seed_same_run() {
        let a = FrequencyDSTHarness::new(9, FrequencyDSTConfig::chaos()).run();
        let b = FrequencyDSTHarness::new(9, FrequencyDSTConfig::chaos()).run();
        assert_eq!(a.final_count, b.final_count);
        assert_eq!(a.failed_saves, b.failed_saves);
        assert_eq!(a.acknowledged_saves, b.acknowledged_saves);
    }

    #[test]
    fn test_summary_format() {
        let results = run_frequency_dst_batch(0..3, FrequencyDSTConfig::baseline());
        let summary = summarize_frequency_dst_batch(&results);
        assert!(summary.contains("3/3 passed"), "{}", summary);
    }
}
