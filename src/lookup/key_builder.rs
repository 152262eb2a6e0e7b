//! Key Builder Module
//!
//! Extracts compound cache keys from events.

use serde_json::{Number, Value};

use crate::cache::Key;
use crate::error::KeyError;
use crate::event::{get_path, kind_of, Event};

// == Key Builder ==
/// Builds a [`Key`] from a fixed, ordered list of event fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    fields: Vec<String>,
}

impl KeyBuilder {
    /// Creates a builder for the given field paths.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Returns the key field paths.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    // == Build ==
    /// Extracts the key; fails if any field is missing or has no string form.
    pub fn build(&self, event: &Event) -> Result<Key, KeyError> {
        self.fields
            .iter()
            .map(|field| {
                let value =
                    get_path(event, field).ok_or_else(|| KeyError::MissingField(field.clone()))?;
                key_string(field, value)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Key::new)
    }
}

/// Converts a single field value to its key string.
///
/// Strings are used as-is, integers in base 16 and floats in their shortest
/// round-trip decimal form. Anything else cannot be part of a key.
pub fn key_string(field: &str, value: &Value) -> Result<String, KeyError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(number_string(n)),
        other => Err(KeyError::UnsupportedType {
            field: field.to_string(),
            kind: kind_of(other),
        }),
    }
}

fn number_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        if i < 0 {
            format!("-{:x}", i.unsigned_abs())
        } else {
            format!("{:x}", i)
        }
    } else if let Some(u) = n.as_u64() {
        format!("{:x}", u)
    } else {
        // Display on f64 prints the shortest string that round-trips.
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
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

    fn builder(fields: &[&str]) -> KeyBuilder {
        KeyBuilder::new(fields.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_build_in_configured_order() {
        let e = event(json!({"a": "x", "b": {"c": "y"}}));
        let key = builder(&["b.c", "a"]).build(&e).unwrap();
        assert_eq!(key.fields(), ["y", "x"]);
    }

    #[test]
    fn test_number_formats() {
        let e = event(json!({"int": 255, "neg": -255, "big": u64::MAX, "float": 1.5, "whole": 2.0}));
        let key = builder(&["int", "neg", "big", "float", "whole"]).build(&e).unwrap();
        assert_eq!(key.fields(), ["ff", "-ff", "ffffffffffffffff", "1.5", "2"]);
    }

    #[test]
    fn test_missing_field_fails_whole_key() {
        let e = event(json!({"a": "x"}));
        let err = builder(&["a", "b"]).build(&e).unwrap_err();
        assert_eq!(err, KeyError::MissingField("b".to_string()));
    }

    #[test]
    fn test_unsupported_types() {
        let e = event(json!({"flag": true, "list": [1], "obj": {}, "nothing": null}));
        for field in ["flag", "list", "obj", "nothing"] {
            let err = builder(&[field]).build(&e).unwrap_err();
            assert!(matches!(err, KeyError::UnsupportedType { .. }), "{}", field);
        }
    }
}
