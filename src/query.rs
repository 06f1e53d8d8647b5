// ABOUTME: Query-string preparation for engine API requests.
// ABOUTME: Drops nulls, encodes booleans as 1/0, JSON-encodes nested values.

use serde_json::Value;

use crate::mapping::Object;

/// Flatten request parameters into query pairs.
///
/// Null values are dropped (also inside nested objects), booleans become
/// `"1"`/`"0"` at every depth, and objects or arrays are JSON-encoded.
pub fn prepare_params(params: &Object) -> Vec<(String, String)> {
    clean(params)
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

/// Percent-encoded `k=v&k=v` form of [`prepare_params`].
pub fn to_query_string(params: &Object) -> String {
    prepare_params(params)
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn clean(map: &Object) -> Object {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), prepare(v)))
        .collect()
}

fn prepare(value: &Value) -> Value {
    match value {
        Value::Bool(true) => Value::String("1".to_string()),
        Value::Bool(false) => Value::String("0".to_string()),
        Value::Object(map) => Value::Object(clean(map)),
        Value::Array(items) => Value::Array(items.iter().map(prepare).collect()),
        other => other.clone(),
    }
}
