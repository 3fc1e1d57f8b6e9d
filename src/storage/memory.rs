use super::{validate_id, Storage, StorageError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct StoredDomain {
    info: Option<Vec<u8>>,
    data: Option<Vec<u8>>,
}

/// In-memory storage for unit tests and embedding
///
/// Clones share the same underlying map, so a test can hand one clone to a
/// domain and inspect what it persisted through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    domains: Arc<RwLock<BTreeMap<String, StoredDomain>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provisioned domains (for testing)
    pub fn len(&self) -> usize {
        self.domains.read().len()
    }

    /// Check if empty (for testing)
    pub fn is_empty(&self) -> bool {
        self.domains.read().is_empty()
    }
}

impl Storage for InMemoryStorage {
    fn create(&self, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        self.domains.write().entry(id.to_string()).or_default();
        Ok(())
    }

    fn save_info(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_id(id)?;
        self.domains.write().entry(id.to_string()).or_default().info = Some(data.to_vec());
        Ok(())
    }

    fn load_info(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        validate_id(id)?;
        self.domains
            .read()
            .get(id)
            .and_then(|d| d.info.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn save_data(&self, id: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_id(id)?;
        self.domains.write().entry(id.to_string()).or_default().data = Some(data.to_vec());
        Ok(())
    }

    fn load_data(&self, id: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_id(id)?;
        Ok(self.domains.read().get(id).and_then(|d| d.data.clone()))
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        validate_id(id)?;
        self.domains.write().remove(id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .domains
            .read()
            .iter()
            .filter(|(_, d)| d.info.is_some())
            .map(|(id, _)| id.clone())
            .collect())
    }
}
