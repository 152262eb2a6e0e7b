//! Event Module
//!
//! Events are ordered JSON objects. Fields are addressed by dotted paths
//! (`"host.name"` walks into the `host` object).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{LookupError, Result};

/// An event flowing through the engine.
pub type Event = Map<String, Value>;

// == Path Access ==
/// Resolves a dotted path inside an event.
pub fn get_path<'a>(event: &'a Event, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = event.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Stores `value` at a dotted path, creating intermediate objects.
///
/// Fails if an intermediate segment exists and is not an object.
pub fn put_path(event: &mut Event, path: &str, value: Value) -> Result<()> {
    let (map, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (object_at_mut(event, parent)?, leaf),
        None => (event, path),
    };
    map.insert(leaf.to_string(), value);
    Ok(())
}

/// Recursively merges `source` into `target`.
///
/// Objects present on both sides are merged, every other value in
/// `source` overwrites what `target` holds.
pub fn deep_update(target: &mut Event, source: &Event) {
    for (key, value) in source {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (target.get_mut(key), value)
        {
            deep_update(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Merges `fields` into the object found at `path`, or at the root when
/// `path` is empty.
pub fn merge_at(event: &mut Event, path: &str, fields: &Event) -> Result<()> {
    if path.is_empty() {
        deep_update(event, fields);
        return Ok(());
    }
    let target = object_at_mut(event, path)?;
    deep_update(target, fields);
    Ok(())
}

// == Timestamps ==
/// Reads an RFC 3339 timestamp from the event, if present and well formed.
pub fn timestamp(event: &Event, field: &str) -> Option<DateTime<Utc>> {
    let raw = get_path(event, field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Name of a JSON value's type, for diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn object_at_mut<'a>(event: &'a mut Event, path: &str) -> Result<&'a mut Event> {
    let mut current = event;
    for segment in path.split('.') {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match slot {
            Value::Object(map) => map,
            other => {
                return Err(LookupError::Merge(format!(
                    "cannot write below {}: field '{}' is {}",
                    path,
                    segment,
                    kind_of(other)
                )))
            }
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> Event {
        match value {
            Value::Object(map) => map,
            _ => panic!("test event must be an object"),
        }
    }

    #[test]
    fn test_get_path_nested() {
        let e = event(json!({"host": {"name": "web-1"}, "pid": 7}));
        assert_eq!(get_path(&e, "host.name"), Some(&json!("web-1")));
        assert_eq!(get_path(&e, "pid"), Some(&json!(7)));
        assert_eq!(get_path(&e, "host.ip"), None);
        assert_eq!(get_path(&e, "pid.value"), None);
    }

    #[test]
    fn test_put_path_creates_objects() {
        let mut e = Event::new();
        put_path(&mut e, "a.b.c", json!(1)).unwrap();
        assert_eq!(Value::Object(e), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_put_path_conflict() {
        let mut e = event(json!({"a": "scalar"}));
        let result = put_path(&mut e, "a.b", json!(1));
        assert!(matches!(result, Err(LookupError::Merge(_))));
    }

    #[test]
    fn test_deep_update_merges_objects() {
        let mut target = event(json!({"a": {"x": 1, "y": 2}, "b": 1}));
        let source = event(json!({"a": {"y": 3, "z": 4}, "b": {"nested": true}}));
        deep_update(&mut target, &source);
        assert_eq!(
            Value::Object(target),
            json!({"a": {"x": 1, "y": 3, "z": 4}, "b": {"nested": true}})
        );
    }

    #[test]
    fn test_merge_at_conflicting_target() {
        let mut e = event(json!({"lookup": 5}));
        let fields = event(json!({"field": 1}));
        assert!(merge_at(&mut e, "lookup", &fields).is_err());
    }

    #[test]
    fn test_timestamp() {
        let e = event(json!({"@timestamp": "2024-05-01T10:00:00Z", "bad": 12}));
        let ts = timestamp(&e, "@timestamp").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(timestamp(&e, "bad").is_none());
        assert!(timestamp(&e, "missing").is_none());
    }
}
