//! Identity records shared by every counter domain

use super::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State-map key under which domains cache their total event count
pub const STATE_COUNT_KEY: &str = "count";

/// Counter family member, persisted as a short type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainType {
    /// Set membership (bloom filter)
    #[serde(rename = "bloom")]
    Membership,
    /// Distinct count (HyperLogLog++)
    #[serde(rename = "hllpp")]
    Cardinality,
    /// Per-key frequency (count-min-log)
    #[serde(rename = "cml")]
    Frequency,
    /// Heavy hitters (top-k)
    #[serde(rename = "topk")]
    Rank,
}

impl DomainType {
    /// Persisted type tag
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainType::Membership => "bloom",
            DomainType::Cardinality => "hllpp",
            DomainType::Frequency => "cml",
            DomainType::Rank => "topk",
        }
    }
}

impl std::fmt::Display for DomainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity record: who a domain is, what it is, and its cached state
///
/// `id` and `domain_type` never change after construction; only the state
/// map is updated, and only by the owning domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    id: String,
    #[serde(rename = "type")]
    domain_type: DomainType,
    #[serde(default)]
    state: BTreeMap<String, u64>,
}

impl Info {
    pub fn new(id: impl Into<String>, domain_type: DomainType) -> Self {
        Info {
            id: id.into(),
            domain_type,
            state: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn domain_type(&self) -> DomainType {
        self.domain_type
    }

    pub fn state(&self) -> &BTreeMap<String, u64> {
        &self.state
    }

    /// Cached total event count, if one was ever saved
    pub fn count(&self) -> Option<u64> {
        self.state.get(STATE_COUNT_KEY).copied()
    }

    pub(crate) fn set_count(&mut self, count: u64) {
        self.state.insert(STATE_COUNT_KEY.to_string(), count);
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self).map_err(|e| DomainError::Serialization(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes).map_err(|e| DomainError::CorruptRecord(e.to_string()))
    }
}
