//! Structural Merge
//!
//! Pure deep merge of JSON maps, used for transport defaults, grant bodies and
//! JWT extra claims.

use serde_json::{Map, Value};

/// Merge `overlay` into `base`.
///
/// Scalars and arrays in `overlay` replace those in `base`; when both sides
/// hold an object under the same key the merge recurses.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            Value::Object(merge_maps(base, overlay))
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Map flavour of [`deep_merge`].
pub fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let next = match merged.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}
