pub mod config;
pub mod domain;
pub mod observability;
pub mod simulator;
pub mod sketch;
pub mod storage;

pub use config::{Config, ConfigError};
pub use domain::{
    Counter, DomainError, DomainOptions, DomainType, FrequencyDomain, Info, SavePolicy,
};
pub use sketch::{CountMinLogSketch, SketchError};
pub use storage::{InMemoryStorage, LocalFsStorage, Storage, StorageError};
