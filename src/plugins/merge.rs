//! Deep merge of plugin options.
//!
//! Objects merge key by key, recursively. Arrays on both sides are
//! concatenated. Any other pairing takes the right-hand value. Neither input
//! is modified.

use serde_json::Value;

/// Merge `source` over `target`, returning a new value.
pub fn deep_merge(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(base), Value::Object(layer)) => {
            let mut merged = base.clone();
            for (key, value) in layer {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Array(base), Value::Array(layer)) => {
            Value::Array(base.iter().chain(layer.iter()).cloned().collect())
        }
        (_, source) => source.clone(),
    }
}

/// Merge several layers left to right; later layers win.
pub fn deep_merge_all<'a, I>(layers: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    layers
        .into_iter()
        .fold(Value::Object(Default::default()), |acc, layer| {
            deep_merge(&acc, layer)
        })
}
