//! Key-path lookup into a JSON value.
//!
//! Paths use dotted and bracketed segments: `total`, `meta.total`,
//! `pages[0].count`, `data['total']`. Lookup never panics; a missing or
//! unreachable segment yields the caller's default.

use serde_json::Value;

/// Walk `value` along `path`, returning the nested value or `default`.
///
/// Traversal stops and falls back to the default when it reaches `null`
/// before the final segment, when a key or index is absent, or when a
/// non-container is indexed. A value that *is* `null` at the final segment
/// is returned as `Value::Null`, not replaced by the default.
///
/// # Example
///
/// ```ignore
/// let v = json!({"a": {"b": [10, 20]}});
/// assert_eq!(get(&v, "a.b[1]", json!(0)), json!(20));
/// assert_eq!(get(&v, "a.missing", json!(0)), json!(0));
/// ```
pub fn get(value: &Value, path: &str, default: Value) -> Value {
    traverse(value, path).cloned().unwrap_or(default)
}

/// Numeric variant of [`get`] used for pagination totals.
///
/// Accepts integers, floats (truncated) and numeric strings.
pub fn get_u64(value: &Value, path: &str, default: u64) -> u64 {
    traverse(value, path)
        .and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_f64().map(|f| f as u64))
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
        .unwrap_or(default)
}

fn traverse<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for raw in path.split(['.', '[', ']']) {
        let segment: String = raw.chars().filter(|c| *c != '\'' && *c != '"').collect();
        if segment.trim().is_empty() {
            continue;
        }
        current = match current {
            Value::Null => return None,
            Value::Object(map) => map.get(segment.as_str())?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
