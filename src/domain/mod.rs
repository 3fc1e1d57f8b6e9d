//! Counter Domains
//!
//! A domain is a named, persisted probabilistic counter. Every domain type
//! shares one capability surface, the [`Counter`] trait; each concrete type
//! overrides the operations it supports and rejects the rest with
//! [`DomainError::UnsupportedOperation`].
//!
//! | Operation | Frequency (`cml`) |
//! |-----------|-------------------|
//! | add / add_multiple | yes |
//! | remove / remove_multiple | no |
//! | get_count | yes (exact) |
//! | get_frequency | yes (estimate) |
//! | clear / save | yes |

mod error;
mod frequency;
mod info;

pub mod dst;

pub use error::DomainError;
pub use frequency::{DomainOptions, FrequencyDomain, SavePolicy};
pub use info::{DomainType, Info, STATE_COUNT_KEY};

use std::collections::HashMap;
use tracing::error;

/// Capability surface shared by every counter domain
///
/// Implementations must be safe to share across threads; all methods take
/// `&self` and synchronize internally.
pub trait Counter: Send + Sync {
    /// Which member of the counter family this is
    fn domain_type(&self) -> DomainType;

    /// Persisted type tag, e.g. `"cml"`
    fn get_type(&self) -> &'static str {
        self.domain_type().as_str()
    }

    /// Record one occurrence of `value`
    fn add(&self, value: &[u8]) -> Result<bool, DomainError>;

    /// Record one occurrence of each value, atomically with respect to readers
    fn add_multiple(&self, values: &[&[u8]]) -> Result<bool, DomainError>;

    fn remove(&self, _value: &[u8]) -> Result<bool, DomainError> {
        Err(unsupported(self.domain_type(), "remove"))
    }

    fn remove_multiple(&self, _values: &[&[u8]]) -> Result<bool, DomainError> {
        Err(unsupported(self.domain_type(), "remove_multiple"))
    }

    /// Total number of events recorded since creation or the last clear
    fn get_count(&self) -> u64;

    /// Per-value estimates, keyed by the raw value bytes
    fn get_frequency(&self, _values: &[&[u8]]) -> Result<HashMap<Vec<u8>, u64>, DomainError> {
        Err(unsupported(self.domain_type(), "get_frequency"))
    }

    /// Discard all recorded events
    fn clear(&self) -> Result<bool, DomainError>;

    /// Persist the current state through the storage collaborator
    fn save(&self) -> Result<(), DomainError>;
}

pub(crate) fn unsupported(domain_type: DomainType, operation: &'static str) -> DomainError {
    error!(%domain_type, operation, "Rejected unsupported operation");
    DomainError::UnsupportedOperation {
        domain_type,
        operation,
    }
}
