//! Request DTOs for the lookup server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LookupError, Result};
use crate::event::{kind_of, Event};

/// Request body for the lookup operation (POST /lookup)
///
/// The body is the event itself; it must be a JSON object.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct LookupRequest {
    /// The submitted event
    pub event: Value,
}

impl LookupRequest {
    /// Validates the body and returns it as an event.
    pub fn into_event(self) -> Result<Event> {
        match self.event {
            Value::Object(event) => Ok(event),
            other => Err(LookupError::InvalidEvent(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_request_deserialize() {
        let req: LookupRequest = serde_json::from_str(r#"{"key": "1", "b": true}"#).unwrap();
        let event = req.into_event().unwrap();
        assert_eq!(event.len(), 2);
        assert_eq!(event["key"], "1");
    }

    #[test]
    fn test_lookup_request_preserves_field_order() {
        let req: LookupRequest = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<_> = req.into_event().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_lookup_request_rejects_non_object() {
        let req: LookupRequest = serde_json::from_str("[1, 2]").unwrap();
        assert!(matches!(req.into_event(), Err(LookupError::InvalidEvent(_))));
    }
}
