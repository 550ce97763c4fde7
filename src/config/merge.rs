//! Deep merge and deep filter for layered YAML documents.
//!
//! Implements key-by-key merging where later documents override earlier ones.
//! Sequences are replaced entirely, not concatenated.

use crate::error::{Result, SweepError};
use serde_yaml::Value;

/// Deep merge two YAML values, with `overlay` taking precedence over `base`.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Sequences, strings, numbers, booleans, nulls are replaced entirely
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are mappings: merge recursively
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Mapping(base_map)
        }
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge` over the list.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Mapping(Default::default()), deep_merge)
}

/// Project `base` onto the key shape of `selector`.
///
/// For every key in the selector: if both sides hold mappings, recurse;
/// otherwise the base's value is taken verbatim. Keys absent from the
/// selector are dropped. A selector key missing from the base is an error.
pub fn deep_filter(base: &Value, selector: &Value) -> Result<Value> {
    match (base, selector) {
        (Value::Mapping(base_map), Value::Mapping(selector_map)) => {
            let mut filtered = serde_yaml::Mapping::new();
            for (key, selector_value) in selector_map {
                let base_value = base_map.get(key).ok_or_else(|| {
                    SweepError::key_not_found(key.as_str().unwrap_or("<non-string>"))
                })?;
                let kept = if base_value.is_mapping() && selector_value.is_mapping() {
                    deep_filter(base_value, selector_value)?
                } else {
                    base_value.clone()
                };
                filtered.insert(key.clone(), kept);
            }
            Ok(Value::Mapping(filtered))
        }
        _ => Ok(base.clone()),
    }
}
