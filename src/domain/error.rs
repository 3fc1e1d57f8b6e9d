//! Domain errors

use super::DomainType;
use crate::sketch::SketchError;
use crate::storage::StorageError;

/// Error returned by counter domain operations
///
/// Failures during a save never roll back in-memory state: the mutation that
/// triggered the save has already been applied when one of these is returned.
#[derive(Debug)]
pub enum DomainError {
    /// Sketch sizing rejected before any domain was created
    InvalidParameters(SketchError),
    /// Operation outside this domain type's capability set
    UnsupportedOperation {
        domain_type: DomainType,
        operation: &'static str,
    },
    /// Info record or sketch snapshot could not be encoded
    Serialization(String),
    /// Persisted info record or snapshot could not be decoded
    CorruptRecord(String),
    /// Storage rejected a write
    StorageWrite(StorageError),
    /// Storage could not be read
    StorageRead(StorageError),
    /// Info record belongs to a different counter type
    TypeMismatch {
        expected: DomainType,
        actual: DomainType,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidParameters(e) => write!(f, "{}", e),
            DomainError::UnsupportedOperation {
                domain_type,
                operation,
            } => write!(
                f,
                "Domain type {} does not support {}",
                domain_type, operation
            ),
            DomainError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            DomainError::CorruptRecord(msg) => write!(f, "Corrupt persisted record: {}", msg),
            DomainError::StorageWrite(e) => write!(f, "Storage write failed: {}", e),
            DomainError::StorageRead(e) => write!(f, "Storage read failed: {}", e),
            DomainError::TypeMismatch { expected, actual } => write!(
                f,
                "Domain type mismatch: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomainError::InvalidParameters(e) => Some(e),
            DomainError::StorageWrite(e) | DomainError::StorageRead(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SketchError> for DomainError {
    fn from(e: SketchError) -> Self {
        match e {
            SketchError::Snapshot(e) => DomainError::CorruptRecord(e.to_string()),
            e => DomainError::InvalidParameters(e),
        }
    }
}
