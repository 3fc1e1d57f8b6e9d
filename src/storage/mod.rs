//! Domain Storage Abstraction
//!
//! Durable home for two blobs per domain, both keyed by domain ID:
//!
//! - the **info record**: serialized identity (id, type, state map)
//! - the **data blob**: the sketch snapshot
//!
//! Semantics are "last write wins" with no versioning. Calls are synchronous:
//! domains persist while holding their write lock, so a slow backend throttles
//! mutations directly.
//!
//! Implementations:
//! - `InMemoryStorage`: For unit tests and embedding
//! - `LocalFsStorage`: Info and data directories on the local filesystem
//! - `SimulatedStorage`: Fault-injecting wrapper for deterministic simulation

mod local_fs;
mod memory;
mod simulated;

pub use local_fs::LocalFsStorage;
pub use memory::InMemoryStorage;
pub use simulated::{SimulatedStorage, SimulatedStorageConfig, SimulatedStorageStats};

use std::io::{Error as IoError, ErrorKind};

/// Longest accepted domain ID
pub const DOMAIN_ID_LEN_MAX: usize = 255;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    /// No record stored under this ID
    NotFound(String),
    /// ID is empty, too long, or would escape the storage directory
    InvalidId(String),
    /// Underlying I/O failure
    Io(IoError),
    /// Failure injected by `SimulatedStorage`
    Injected(&'static str),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(id) => write!(f, "Domain not found in storage: {}", id),
            StorageError::InvalidId(id) => write!(f, "Invalid domain id: {:?}", id),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Injected(op) => write!(f, "Injected fault during {}", op),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for StorageError {
    fn from(e: IoError) -> Self {
        match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            _ => StorageError::Io(e),
        }
    }
}

/// Storage collaborator for counter domains
pub trait Storage: Send + Sync + 'static {
    /// Provision storage for a new domain. Idempotent.
    fn create(&self, id: &str) -> Result<(), StorageError>;

    /// Persist the serialized info record, overwriting any prior record
    fn save_info(&self, id: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Read the serialized info record
    fn load_info(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Persist the data blob, overwriting any prior blob
    fn save_data(&self, id: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Read the data blob, `None` if the domain never saved one
    fn load_data(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove everything stored for the domain. Missing domains are not an error.
    fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// IDs of all domains with an info record, sorted
    fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Rejects IDs that cannot be used as a storage key
pub fn validate_id(id: &str) -> Result<(), StorageError> {
    let invalid = id.is_empty()
        || id.len() > DOMAIN_ID_LEN_MAX
        || id == "."
        || id == ".."
        || id.contains(&['/', '\\', '\0'][..]);
    if invalid {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}
