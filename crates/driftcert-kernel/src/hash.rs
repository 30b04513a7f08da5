//! Content addressing for file blobs and engine outputs.
//!
//! File contents are treated as content-addressed blobs: two files with the
//! same `ContentHash` are byte-identical, which is what rename detection
//! relies on. Run outputs are digested over a canonical JSON form so that
//! replaying a run can be checked byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// A sha256 content hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    /// Hash the canonical serialization of a JSON value.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        Ok(Self::from_bytes(&canonical_json_bytes(value)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical JSON bytes: object keys sorted at every depth, no
/// insignificant whitespace.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&sort_json_value(value))
}

fn sort_json_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sort_json_value).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, item) in entries {
                sorted.insert(key.clone(), sort_json_value(item));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}
