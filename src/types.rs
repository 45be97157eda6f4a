use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// One observation of a company as it appears in the registry feed.
///
/// The three required columns are lifted into typed fields; everything else
/// the feed carries rides along untouched in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub company_name: String,
    /// Verbatim string form of the feed value (numbers keep their JSON text)
    pub registration_number: String,
    /// Original timestamp text, parsed later into a UTC instant
    pub retrieved_at: String,
    /// Passthrough fields in the order they appeared in the source line
    pub extra: Map<String, Value>,
}

impl RawRecord {
    pub fn new(
        company_name: impl Into<String>,
        registration_number: impl Into<String>,
        retrieved_at: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            registration_number: registration_number.into(),
            retrieved_at: retrieved_at.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}

/// Deterministic grouping key for all observations of one entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterKey(String);

impl ClusterKey {
    pub(crate) fn from_parts(normalized_name: &str, registration_number: &str) -> Self {
        let mut key = String::with_capacity(normalized_name.len() + registration_number.len() + 1);
        key.push_str(normalized_name);
        key.push(crate::constants::CLUSTER_KEY_SEPARATOR);
        key.push_str(registration_number);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A RawRecord keyed and timed, ready for deduplication and versioning
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub record: RawRecord,
    pub cluster_key: ClusterKey,
    pub retrieved_at: DateTime<Utc>,
    /// Zero-based position in the input stream, used by every tie-break
    pub position: usize,
}

/// A surviving observation with its validity interval
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedRecord {
    pub record: RawRecord,
    pub cluster_key: ClusterKey,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_current: bool,
}

impl VersionedRecord {
    /// True when `instant` falls inside this version's validity interval
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.valid_from && self.valid_to.map_or(true, |to| instant <= to)
    }
}
