//! Field comparison between a local payload and a remote record.

use serde_json::{Map, Value};

use dcimsync_inventory::{RemoteEntity, collapse};

/// Whether a local value already matches what the inventory holds.
///
/// Remote related records and choices compare by their `id`/`value`,
/// numbers compare numerically (`1` matches `1.0` and `"1"`) and an empty
/// string matches `null`. A field the remote record does not carry never
/// matches.
pub fn values_match(local: &Value, remote: Option<&Value>) -> bool {
    let Some(remote) = remote else {
        return false;
    };
    let remote = collapse(remote);
    match (local, &remote) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a.as_f64(), b.as_f64()),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            numbers_equal(n.as_f64(), s.trim().parse::<f64>().ok())
        }
        (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(l, r)| values_match(&collapse(l), Some(r)))
        }
        (l, r) => l == r,
    }
}

fn numbers_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Fields of `payload` whose value differs from `remote`.
pub fn changed_fields(payload: &Map<String, Value>, remote: &RemoteEntity) -> Map<String, Value> {
    payload
        .iter()
        .filter(|(key, value)| !values_match(value, remote.field(key)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
