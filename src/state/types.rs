//! State types for tracking sync progress
//!
//! These types are serialized to JSON and handed to the surrounding sync
//! engine for durable storage between runs.

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Per-partition cursor state: which partition, and how far it has synced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionCursorState {
    /// Partition zone values
    #[serde(default)]
    pub partition: JsonObject,

    /// Cursor mapping for that partition (e.g. `{"updated_at": "..."}`)
    #[serde(default)]
    pub cursor: JsonObject,
}

impl PartitionCursorState {
    /// Create a per-partition state entry
    pub fn new(partition: JsonObject, cursor: JsonObject) -> Self {
        Self { partition, cursor }
    }
}

/// State of a stream whose progress is tracked per partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionedState {
    /// One entry per tracked partition
    #[serde(default)]
    pub states: Vec<PartitionCursorState>,
}

impl PartitionedState {
    /// Create an empty partitioned state
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the cursor for a partition by its canonical key
    pub fn cursor_for(&self, partition_key: &str) -> Option<&JsonObject> {
        self.states
            .iter()
            .find(|s| serde_json::to_string(&s.partition).unwrap_or_default() == partition_key)
            .map(|s| &s.cursor)
    }

    /// Serialize to the wire mapping
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Deserialize from the wire mapping; absent/odd shapes become empty
    pub fn from_value(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// State of a stream tracked by one shared cursor across all partitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    /// The shared cursor mapping
    #[serde(default)]
    pub state: JsonObject,

    /// Marks the shape so a resumed sync does not mistake it for flat
    /// datetime state
    #[serde(default)]
    pub uses_global_cursor: bool,
}

impl GlobalState {
    /// Create a global state from a cursor mapping
    pub fn new(state: JsonObject) -> Self {
        Self {
            state,
            uses_global_cursor: true,
        }
    }

    /// Serialize to the wire mapping
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Deserialize from the wire mapping
    pub fn from_value(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_partitioned_state_roundtrip() {
        let state = PartitionedState {
            states: vec![PartitionCursorState::new(
                obj(json!({"account_id": "a1"})),
                obj(json!({"updated_at": "2024-01-05"})),
            )],
        };

        let value = state.to_value();
        assert_eq!(
            value,
            json!({"states": [{"partition": {"account_id": "a1"},
                               "cursor": {"updated_at": "2024-01-05"}}]})
        );
        assert_eq!(PartitionedState::from_value(&value), state);
    }

    #[test]
    fn test_partitioned_state_cursor_lookup() {
        let state = PartitionedState {
            states: vec![PartitionCursorState::new(
                obj(json!({"id": "p1"})),
                obj(json!({"created": "2024-02-01"})),
            )],
        };

        let key = serde_json::to_string(&obj(json!({"id": "p1"}))).unwrap();
        assert_eq!(
            state.cursor_for(&key),
            Some(&obj(json!({"created": "2024-02-01"})))
        );
        assert!(state.cursor_for(r#"{"id":"p2"}"#).is_none());
    }

    #[test]
    fn test_partitioned_state_tolerates_unknown_shapes() {
        let state = PartitionedState::from_value(&json!({"something": "else"}));
        assert!(state.states.is_empty());
    }

    #[test]
    fn test_global_state_roundtrip() {
        let state = GlobalState::new(obj(json!({"created": "2024-03-01"})));
        let value = state.to_value();

        assert_eq!(value["uses_global_cursor"], json!(true));
        assert_eq!(GlobalState::from_value(&value), state);
    }
}
