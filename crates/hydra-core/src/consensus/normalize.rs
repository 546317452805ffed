//! Canonical normalization of JSON-RPC results for vote counting.
//!
//! Two structurally equal objects whose keys arrive in different order
//! must count as the same result. Normalization recursively sorts object
//! keys (arrays keep their order, object elements inside them are sorted
//! individually) and serializes the value to a canonical string key.
//! Strings are their own key and skip serialization entirely, so the
//! common hex-string results stay allocation-cheap.

use serde_json::Value;

/// Derives the canonical tally key for a result value.
///
/// Returns the key and whether serialization was needed (`false` for
/// plain strings, `true` for everything else).
#[must_use]
pub fn canonical_key(value: &Value) -> (String, bool) {
    match value {
        Value::String(s) => (s.clone(), false),
        other => (sort_json(other).to_string(), true),
    }
}

/// Recursively rebuilds `value` with object keys in sorted order.
fn sort_json(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sort_json).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), sort_json(&map[key]));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}
