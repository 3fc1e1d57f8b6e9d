//! Frequency Domain
//!
//! Persisted count-min-log counter. One reader-writer lock guards the info
//! record, the sketch and the save bookkeeping together, so readers never
//! observe half of an `add_multiple` and a save always captures a state some
//! reader could have seen.
//!
//! ## Persistence
//!
//! Two blobs per domain: the info record carrying the exact total in
//! `state["count"]`, and the sketch snapshot holding every cell.
//!
//! | Trigger | Info record | Snapshot |
//! |---------|-------------|----------|
//! | add / add_multiple, `EveryMutation` | yes | no |
//! | add / add_multiple, `Threshold` due | yes | yes |
//! | clear | yes | yes |
//! | `save`, `flush` (if anything pending) | yes | yes |
//!
//! A per-event save therefore costs one small JSON write, independent of the
//! table size. Full writes go snapshot first, then info record.
//!
//! A failed save is logged and returned to the caller, but the mutation that
//! triggered it stays applied and stays pending until a later save succeeds.
//! On open, the info record's count is authoritative and the snapshot
//! supplies the cells.

use super::{Counter, DomainError, DomainType, Info};
use crate::config::{Config, DEFAULT_DELTA, DEFAULT_EPSILON};
use crate::sketch::CountMinLogSketch;
use crate::storage::Storage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// When mutations are written through to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// Save the info record after every add and add_multiple; the snapshot
    /// waits for `clear`, `save` or `flush`
    EveryMutation,
    /// Save everything on a mutation only if this long has passed since the
    /// last successful save; `flush` writes whatever is pending
    Threshold(Duration),
}

impl SavePolicy {
    fn is_due(&self, last_save: Option<Instant>, now: Instant) -> bool {
        match self {
            SavePolicy::EveryMutation => true,
            SavePolicy::Threshold(interval) => {
                last_save.map_or(true, |at| now.duration_since(at) >= *interval)
            }
        }
    }
}

/// What a save writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveScope {
    InfoOnly,
    Full,
}

/// Construction parameters for a frequency domain
#[derive(Debug, Clone)]
pub struct DomainOptions {
    /// Relative error bound, as a fraction of the total count
    pub epsilon: f64,
    /// Sizing confidence parameter, in (0, 1)
    pub delta: f64,
    pub save_policy: SavePolicy,
    /// Seed for the sketch's increment decisions; `None` draws one from
    /// OS entropy
    pub seed: Option<u64>,
}

impl Default for DomainOptions {
    fn default() -> Self {
        DomainOptions {
            epsilon: DEFAULT_EPSILON,
            delta: DEFAULT_DELTA,
            save_policy: SavePolicy::EveryMutation,
            seed: None,
        }
    }
}

impl DomainOptions {
    /// Sketch parameters and save threshold from resolved configuration
    pub fn from_config(config: &Config) -> Self {
        DomainOptions {
            epsilon: config.epsilon,
            delta: config.delta,
            save_policy: SavePolicy::Threshold(config.save_threshold()),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_save_policy(mut self, save_policy: SavePolicy) -> Self {
        self.save_policy = save_policy;
        self
    }

    fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

struct DomainState {
    info: Info,
    sketch: CountMinLogSketch,
    /// Count changed since the info record was last written
    info_pending: bool,
    /// Cells changed since the snapshot was last written
    snapshot_pending: bool,
    last_save: Option<Instant>,
}

/// Persisted, thread-safe frequency counter
pub struct FrequencyDomain {
    id: String,
    storage: Arc<dyn Storage>,
    save_policy: SavePolicy,
    state: RwLock<DomainState>,
}

impl std::fmt::Debug for FrequencyDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("FrequencyDomain")
            .field("id", &self.id)
            .field("save_policy", &self.save_policy)
            .field("sketch", &state.sketch)
            .field("info_pending", &state.info_pending)
            .field("snapshot_pending", &state.snapshot_pending)
            .finish()
    }
}

impl FrequencyDomain {
    /// Create a brand-new domain: provision storage, then save immediately.
    ///
    /// Invalid sketch parameters or a wrong info type fail before storage is
    /// touched. A failed initial save is logged and leaves the domain dirty.
    pub fn create(
        info: Info,
        storage: Arc<dyn Storage>,
        options: DomainOptions,
    ) -> Result<Self, DomainError> {
        check_type(&info)?;
        let sketch =
            CountMinLogSketch::with_seed(options.epsilon, options.delta, options.resolve_seed())?;
        storage.create(info.id()).map_err(DomainError::StorageWrite)?;

        info!(
            id = %info.id(),
            width = sketch.width(),
            depth = sketch.depth(),
            "Created frequency domain"
        );
        let domain = Self::assemble(info, sketch, storage, options.save_policy, true);
        // Failure already logged by persist; the domain stays dirty
        let _ = domain.save();
        Ok(domain)
    }

    /// Rehydrate a domain from its info record and whatever snapshot storage
    /// holds. The cached count wins over the snapshot's; without a snapshot
    /// the sketch starts empty and only the count is restored.
    pub fn open(
        info: Info,
        storage: Arc<dyn Storage>,
        options: DomainOptions,
    ) -> Result<Self, DomainError> {
        check_type(&info)?;
        let seed = options.resolve_seed();

        let mut sketch = match storage.load_data(info.id()).map_err(DomainError::StorageRead)? {
            Some(bytes) => CountMinLogSketch::from_bytes(&bytes, seed)
                .map_err(|e| DomainError::CorruptRecord(e.to_string()))?,
            None => {
                warn!(id = %info.id(), "No snapshot found, starting from an empty sketch");
                CountMinLogSketch::with_seed(options.epsilon, options.delta, seed)?
            }
        };
        if let Some(cached) = info.count() {
            if cached != sketch.count() {
                debug!(
                    id = %info.id(),
                    cached,
                    snapshot = sketch.count(),
                    "Snapshot lags the info record, restoring cached count"
                );
                sketch.set_count(cached);
            }
        }

        info!(id = %info.id(), count = sketch.count(), "Opened frequency domain");
        Ok(Self::assemble(info, sketch, storage, options.save_policy, false))
    }

    /// Read the info record for `id` from storage and rehydrate it
    pub fn load(
        id: &str,
        storage: Arc<dyn Storage>,
        options: DomainOptions,
    ) -> Result<Self, DomainError> {
        let bytes = storage.load_info(id).map_err(DomainError::StorageRead)?;
        let info = Info::from_json(&bytes)?;
        if info.id() != id {
            return Err(DomainError::CorruptRecord(format!(
                "info record for {:?} names {:?}",
                id,
                info.id()
            )));
        }
        Self::open(info, storage, options)
    }

    fn assemble(
        info: Info,
        sketch: CountMinLogSketch,
        storage: Arc<dyn Storage>,
        save_policy: SavePolicy,
        pending: bool,
    ) -> Self {
        FrequencyDomain {
            id: info.id().to_string(),
            storage,
            save_policy,
            state: RwLock::new(DomainState {
                info,
                sketch,
                info_pending: pending,
                snapshot_pending: pending,
                last_save: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
    }

    /// Info record as it would be saved now
    pub fn info(&self) -> Info {
        let state = self.state.read();
        let mut info = state.info.clone();
        info.set_count(state.sketch.count());
        info
    }

    /// Sketch (width, depth)
    pub fn dimensions(&self) -> (usize, usize) {
        let state = self.state.read();
        (state.sketch.width(), state.sketch.depth())
    }

    /// True if the info record or the snapshot is behind memory
    pub fn is_dirty(&self) -> bool {
        let state = self.state.read();
        state.info_pending || state.snapshot_pending
    }

    /// True if cells changed since the snapshot was last written
    pub fn snapshot_pending(&self) -> bool {
        self.state.read().snapshot_pending
    }

    /// Write info record and snapshot if either is behind memory
    pub fn flush(&self) -> Result<(), DomainError> {
        let mut state = self.state.write();
        if !state.info_pending && !state.snapshot_pending {
            return Ok(());
        }
        self.persist(&mut state, SaveScope::Full)
    }

    /// Remove every persisted record of this domain
    pub fn destroy(self) -> Result<(), DomainError> {
        self.storage
            .delete(&self.id)
            .map_err(DomainError::StorageWrite)?;
        info!(id = %self.id, "Destroyed frequency domain");
        Ok(())
    }

    /// Apply `f` under the write lock, then save per policy. `rewrites_table`
    /// forces a full save for mutations that replace most cells at once.
    fn mutate<F>(&self, rewrites_table: bool, f: F) -> Result<bool, DomainError>
    where
        F: FnOnce(&mut CountMinLogSketch),
    {
        let mut state = self.state.write();
        f(&mut state.sketch);
        state.sketch.verify_invariants();
        state.info_pending = true;
        state.snapshot_pending = true;

        let scope = match self.save_policy {
            _ if rewrites_table => Some(SaveScope::Full),
            SavePolicy::EveryMutation => Some(SaveScope::InfoOnly),
            policy if policy.is_due(state.last_save, Instant::now()) => Some(SaveScope::Full),
            SavePolicy::Threshold(_) => None,
        };
        if let Some(scope) = scope {
            self.persist(&mut state, scope)?;
        }
        Ok(true)
    }

    /// Caller holds the write lock.
    fn persist(&self, state: &mut DomainState, scope: SaveScope) -> Result<(), DomainError> {
        state.info.set_count(state.sketch.count());
        let info = state.info.to_json()?;
        let data = match scope {
            SaveScope::Full => Some(
                state
                    .sketch
                    .to_bytes()
                    .map_err(|e| DomainError::Serialization(e.to_string()))?,
            ),
            SaveScope::InfoOnly => None,
        };

        let written = match &data {
            Some(data) => self.storage.save_data(&self.id, data),
            None => Ok(()),
        }
        .and_then(|()| self.storage.save_info(&self.id, &info));

        match written {
            Ok(()) => {
                state.info_pending = false;
                if data.is_some() {
                    state.snapshot_pending = false;
                    state.last_save = Some(Instant::now());
                }
                debug!(
                    id = %self.id,
                    count = state.sketch.count(),
                    snapshot_bytes = data.as_ref().map_or(0, Vec::len),
                    "Saved domain"
                );
                Ok(())
            }
            Err(e) => {
                error!(id = %self.id, error = %e, "Failed to save domain");
                Err(DomainError::StorageWrite(e))
            }
        }
    }
}

impl Counter for FrequencyDomain {
    fn domain_type(&self) -> DomainType {
        DomainType::Frequency
    }

    fn add(&self, value: &[u8]) -> Result<bool, DomainError> {
        self.mutate(false, |sketch| sketch.increase_count(value))
    }

    fn add_multiple(&self, values: &[&[u8]]) -> Result<bool, DomainError> {
        if values.is_empty() {
            return Ok(true);
        }
        self.mutate(false, |sketch| {
            for value in values {
                sketch.increase_count(value);
            }
        })
    }

    fn get_count(&self) -> u64 {
        self.state.read().sketch.count()
    }

    fn get_frequency(&self, values: &[&[u8]]) -> Result<HashMap<Vec<u8>, u64>, DomainError> {
        let state = self.state.read();
        Ok(values
            .iter()
            .map(|value| (value.to_vec(), state.sketch.get_count(value)))
            .collect())
    }

    fn clear(&self) -> Result<bool, DomainError> {
        self.mutate(true, |sketch| sketch.reset())
    }

    fn save(&self) -> Result<(), DomainError> {
        let mut state = self.state.write();
        self.persist(&mut state, SaveScope::Full)
    }
}

fn check_type(info: &Info) -> Result<(), DomainError> {
    if info.domain_type() != DomainType::Frequency {
        return Err(DomainError::TypeMismatch {
            expected: DomainType::Frequency,
            actual: info.domain_type(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::DeterministicRng;
    use crate::storage::{InMemoryStorage, SimulatedStorage, SimulatedStorageConfig, StorageError};

    fn options() -> DomainOptions {
        DomainOptions {
            epsilon: 0.001,
            delta: 0.01,
            save_policy: SavePolicy::EveryMutation,
            seed: Some(7),
        }
    }

    fn memory() -> (InMemoryStorage, Arc<dyn Storage>) {
        let store = InMemoryStorage::new();
        (store.clone(), Arc::new(store))
    }

    fn keys<'a>(values: &[&'a str]) -> Vec<&'a [u8]> {
        values.iter().map(|v| v.as_bytes()).collect()
    }

    fn persisted_count(store: &impl Storage, id: &str) -> Option<u64> {
        Info::from_json(&store.load_info(id).unwrap()).unwrap().count()
    }

    fn persisted_snapshot(store: &impl Storage, id: &str) -> Vec<u8> {
        store.load_data(id).unwrap().unwrap()
    }

    fn estimate(freq: &HashMap<Vec<u8>, u64>, key: &str) -> u64 {
        freq[key.as_bytes()]
    }

    #[test]
    fn test_create_saves_immediately() {
        let (store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("clicks", DomainType::Frequency), storage, options())
                .unwrap();

        assert_eq!(domain.id(), "clicks");
        assert_eq!(domain.get_type(), "cml");
        assert!(!domain.is_dirty());
        assert_eq!(persisted_count(&store, "clicks"), Some(0));
        assert!(store.load_data("clicks").unwrap().is_some());
    }

    #[test]
    fn test_create_rejects_wrong_type() {
        let (store, storage) = memory();
        let result =
            FrequencyDomain::create(Info::new("set", DomainType::Membership), storage, options());
        assert!(matches!(
            result,
            Err(DomainError::TypeMismatch {
                actual: DomainType::Membership,
                ..
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_rejects_invalid_parameters() {
        let (store, storage) = memory();
        let options = DomainOptions {
            epsilon: 0.0,
            ..options()
        };
        let result =
            FrequencyDomain::create(Info::new("bad", DomainType::Frequency), storage, options);
        assert!(matches!(result, Err(DomainError::InvalidParameters(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_and_get_frequency() {
        let (store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();

        for _ in 0..3 {
            assert!(domain.add(b"a").unwrap());
        }
        assert!(domain.add(b"b").unwrap());
        assert_eq!(domain.get_count(), 4);
        assert_eq!(persisted_count(&store, "d"), Some(4));

        let freq = domain.get_frequency(&keys(&["a", "b", "c"])).unwrap();
        assert_eq!(freq.len(), 3);
        let a = estimate(&freq, "a");
        assert!((2..=3).contains(&a), "a = {}", a);
        assert_eq!(estimate(&freq, "b"), 1);
        assert_eq!(estimate(&freq, "c"), 0);
    }

    #[test]
    fn test_get_frequency_keeps_non_utf8_keys_apart() {
        let (_store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();
        for _ in 0..3 {
            domain.add(b"\xff").unwrap();
        }

        let values: [&[u8]; 2] = [b"\xff", b"\xfe"];
        let freq = domain.get_frequency(&values).unwrap();
        assert_eq!(freq.len(), 2);
        assert!((2..=3).contains(&freq[&b"\xff"[..]]), "{:?}", freq);
        assert_eq!(freq[&b"\xfe"[..]], 0);
    }

    #[test]
    fn test_add_multiple() {
        let (_store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();

        assert!(domain.add_multiple(&keys(&["x", "y", "x"])).unwrap());
        assert_eq!(domain.get_count(), 3);
        assert!(domain.add_multiple(&[]).unwrap());
        assert_eq!(domain.get_count(), 3);
    }

    #[test]
    fn test_remove_unsupported() {
        let (_store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();
        domain.add(b"a").unwrap();
        domain.flush().unwrap();
        let before = domain.get_frequency(&keys(&["a", "b"])).unwrap();

        assert!(matches!(
            domain.remove(b"a"),
            Err(DomainError::UnsupportedOperation {
                domain_type: DomainType::Frequency,
                operation: "remove"
            })
        ));
        assert!(matches!(
            domain.remove_multiple(&keys(&["a"])),
            Err(DomainError::UnsupportedOperation { .. })
        ));
        assert_eq!(domain.get_count(), 1);
        assert_eq!(domain.get_frequency(&keys(&["a", "b"])).unwrap(), before);
        assert!(!domain.is_dirty());
    }

    #[test]
    fn test_clear_resets_and_persists() {
        let (store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();
        domain.add(b"a").unwrap();
        domain.add(b"b").unwrap();

        assert!(domain.clear().unwrap());
        assert_eq!(domain.get_count(), 0);
        assert_eq!(estimate(&domain.get_frequency(&keys(&["a"])).unwrap(), "a"), 0);
        assert_eq!(persisted_count(&store, "d"), Some(0));
        assert!(!domain.snapshot_pending());
        let snapshot = CountMinLogSketch::from_bytes(&persisted_snapshot(&store, "d"), 0).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_every_mutation_writes_snapshot_only_on_flush() {
        let (store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();
        let initial = persisted_snapshot(&store, "d");

        for _ in 0..5 {
            domain.add(b"k").unwrap();
        }
        domain.add_multiple(&keys(&["k", "j"])).unwrap();
        assert_eq!(persisted_count(&store, "d"), Some(7));
        assert_eq!(persisted_snapshot(&store, "d"), initial);
        assert!(domain.snapshot_pending());
        assert!(domain.is_dirty());

        domain.flush().unwrap();
        assert!(!domain.is_dirty());
        let flushed = persisted_snapshot(&store, "d");
        assert_ne!(flushed, initial);
        let snapshot = CountMinLogSketch::from_bytes(&flushed, 0).unwrap();
        assert_eq!(snapshot.count(), 7);
        assert!(snapshot.get_count(b"k") >= 4);

        // Nothing pending, so a second flush leaves storage alone
        domain.flush().unwrap();
        assert_eq!(persisted_snapshot(&store, "d"), flushed);

        domain.add(b"k").unwrap();
        domain.save().unwrap();
        assert!(!domain.snapshot_pending());
        let saved = CountMinLogSketch::from_bytes(&persisted_snapshot(&store, "d"), 0).unwrap();
        assert_eq!(saved.count(), 8);
    }

    #[test]
    fn test_open_prefers_info_count_over_stale_snapshot() {
        let (store, storage) = memory();
        let domain = FrequencyDomain::create(
            Info::new("d", DomainType::Frequency),
            Arc::clone(&storage),
            options(),
        )
        .unwrap();
        domain.add(b"a").unwrap();
        domain.flush().unwrap();
        for _ in 0..4 {
            domain.add(b"a").unwrap();
        }
        drop(domain);

        assert_eq!(persisted_count(&store, "d"), Some(5));
        let reloaded = FrequencyDomain::load("d", storage, options()).unwrap();
        assert_eq!(reloaded.get_count(), 5);
        assert_eq!(estimate(&reloaded.get_frequency(&keys(&["a"])).unwrap(), "a"), 1);
    }

    #[test]
    fn test_failed_save_keeps_mutation() {
        let sim = SimulatedStorage::new(
            InMemoryStorage::new(),
            DeterministicRng::new(11),
            SimulatedStorageConfig::no_faults(),
        );
        let domain = FrequencyDomain::create(
            Info::new("d", DomainType::Frequency),
            Arc::new(sim.clone()),
            options(),
        )
        .unwrap();

        sim.set_config(SimulatedStorageConfig::failing_writes());
        assert!(matches!(
            domain.add(b"a"),
            Err(DomainError::StorageWrite(StorageError::Injected(_)))
        ));
        assert_eq!(domain.get_count(), 1);
        assert!(domain.is_dirty());
        assert_eq!(persisted_count(sim.inner(), "d"), Some(0));

        sim.set_config(SimulatedStorageConfig::no_faults());
        domain.flush().unwrap();
        assert!(!domain.is_dirty());
        assert_eq!(persisted_count(sim.inner(), "d"), Some(1));
    }

    #[test]
    fn test_threshold_policy_defers_until_flush() {
        let (store, storage) = memory();
        let options =
            options().with_save_policy(SavePolicy::Threshold(Duration::from_secs(3600)));
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options)
                .unwrap();
        assert_eq!(persisted_count(&store, "d"), Some(0));

        for _ in 0..5 {
            domain.add(b"k").unwrap();
        }
        assert!(domain.is_dirty());
        assert_eq!(persisted_count(&store, "d"), Some(0));

        domain.flush().unwrap();
        assert!(!domain.is_dirty());
        assert_eq!(persisted_count(&store, "d"), Some(5));
    }

    #[test]
    fn test_threshold_zero_saves_every_time() {
        let (store, storage) = memory();
        let options = options().with_save_policy(SavePolicy::Threshold(Duration::ZERO));
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options)
                .unwrap();
        domain.add(b"k").unwrap();
        assert!(!domain.is_dirty());
        assert_eq!(persisted_count(&store, "d"), Some(1));
    }

    #[test]
    fn test_load_restores_cells() {
        let (_store, storage) = memory();
        let domain = FrequencyDomain::create(
            Info::new("d", DomainType::Frequency),
            Arc::clone(&storage),
            options(),
        )
        .unwrap();
        for i in 0..200u32 {
            domain.add(format!("key-{}", i % 20).as_bytes()).unwrap();
        }
        let keys: Vec<String> = (0..20).map(|i| format!("key-{}", i)).collect();
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
        let before = domain.get_frequency(&key_refs).unwrap();
        domain.flush().unwrap();

        let reloaded = FrequencyDomain::load("d", storage, options()).unwrap();
        assert_eq!(reloaded.get_count(), 200);
        assert_eq!(reloaded.get_frequency(&key_refs).unwrap(), before);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_open_without_snapshot_restores_count() {
        let (store, storage) = memory();
        store
            .save_info("legacy", br#"{"id":"legacy","type":"cml","state":{"count":42}}"#)
            .unwrap();

        let domain = FrequencyDomain::load("legacy", storage, options()).unwrap();
        assert_eq!(domain.get_count(), 42);
        assert_eq!(estimate(&domain.get_frequency(&keys(&["anything"])).unwrap(), "anything"), 0);

        domain.add(b"a").unwrap();
        assert_eq!(domain.get_count(), 43);
    }

    #[test]
    fn test_load_errors() {
        let (store, storage) = memory();
        assert!(matches!(
            FrequencyDomain::load("ghost", Arc::clone(&storage), options()),
            Err(DomainError::StorageRead(StorageError::NotFound(_)))
        ));

        store
            .save_info("broken", br#"{"id":"broken","type":"cml"}"#)
            .unwrap();
        store.save_data("broken", b"garbage").unwrap();
        assert!(matches!(
            FrequencyDomain::load("broken", Arc::clone(&storage), options()),
            Err(DomainError::CorruptRecord(_))
        ));

        store
            .save_info("topk", br#"{"id":"topk","type":"topk"}"#)
            .unwrap();
        assert!(matches!(
            FrequencyDomain::load("topk", storage, options()),
            Err(DomainError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_info_reflects_live_count() {
        let (_store, storage) = memory();
        let options =
            options().with_save_policy(SavePolicy::Threshold(Duration::from_secs(3600)));
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options)
                .unwrap();
        domain.add(b"a").unwrap();
        domain.add(b"a").unwrap();
        assert_eq!(domain.info().count(), Some(2));
    }

    #[test]
    fn test_destroy() {
        let (store, storage) = memory();
        let domain =
            FrequencyDomain::create(Info::new("d", DomainType::Frequency), storage, options())
                .unwrap();
        domain.add(b"a").unwrap();
        domain.destroy().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_is_due() {
        let now = Instant::now();
        assert!(SavePolicy::EveryMutation.is_due(Some(now), now));
        let policy = SavePolicy::Threshold(Duration::from_secs(3));
        assert!(policy.is_due(None, now));
        assert!(!policy.is_due(Some(now), now));
        assert!(policy.is_due(Some(now), now + Duration::from_secs(3)));
    }
}
