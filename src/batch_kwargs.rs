use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A keyed bag describing how to materialize a data sample.
///
/// Batch kwargs are treated as opaque by most of the crate: they carry
/// whatever keys a datasource needs (`path` for file-backed sources,
/// `table` or `query` for database-backed sources, plus arbitrary extras).
/// Keys are stored sorted so serialization and fingerprints are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchKwargs(BTreeMap<String, Value>);

impl BatchKwargs {
    /// Creates an empty batch-kwargs bag.
    pub fn new() -> Self {
        BatchKwargs(BTreeMap::new())
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts a value under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Returns `true` when `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns `true` when the bag carries no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys in the bag.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The `path` key as a string, if present.
    pub fn path(&self) -> Option<&str> {
        self.0.get("path").and_then(Value::as_str)
    }

    /// The `query` key as a string, if present.
    pub fn query(&self) -> Option<&str> {
        self.0.get("query").and_then(Value::as_str)
    }

    /// The `table` key as a string, if present.
    pub fn table(&self) -> Option<&str> {
        self.0.get("table").and_then(Value::as_str)
    }

    /// Merges another bag into this one. Keys from `other` win on conflict.
    pub fn merge(&mut self, other: BatchKwargs) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Iterates over the keys and values in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Deterministic 32-character fingerprint of the bag contents.
    ///
    /// Used as the batch identifier in validation result identifiers and
    /// store paths. Keys are sorted, so two bags with the same contents
    /// always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.0 {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update(b";");
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..32].to_string()
    }
}

impl From<BTreeMap<String, Value>> for BatchKwargs {
    fn from(map: BTreeMap<String, Value>) -> Self {
        BatchKwargs(map)
    }
}

impl FromIterator<(String, Value)> for BatchKwargs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        BatchKwargs(iter.into_iter().collect())
    }
}
