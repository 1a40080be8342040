//! Partition types and traits
//!
//! Defines the core partition abstractions.

use crate::error::Result;
use crate::types::{JsonObject, JsonValue, RequestOption, RequestOptionType, StringMap};

/// One partition: the grouping values a slice carries in its partition
/// zone (e.g. `{"account_id": "a1"}`)
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Values identifying this partition
    pub values: JsonObject,
}

impl Partition {
    /// Create an empty partition
    pub fn new() -> Self {
        Self {
            values: JsonObject::new(),
        }
    }

    /// Create a partition from its values
    pub fn from_values(values: JsonObject) -> Self {
        Self { values }
    }

    /// Add a value
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Canonical string key (serde_json maps are key-ordered, so the
    /// rendering is stable)
    pub fn key(&self) -> String {
        serde_json::to_string(&self.values).unwrap_or_default()
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerates the partitions a substream fans out over
pub trait PartitionRouter: Send + Sync {
    /// Produce the partitions, in a stable order
    fn partitions(&self) -> Result<Vec<Partition>>;

    /// Request option for injecting the partition value, if any
    fn request_option(&self) -> Option<&RequestOption> {
        None
    }

    /// Query parameter fragment carrying the partition value
    fn request_params(&self, partition: &Partition) -> StringMap {
        let mut params = StringMap::new();
        if let Some(option) = self.request_option() {
            if option.inject_into == RequestOptionType::RequestParameter {
                if let Some(value) = partition.values.values().next() {
                    let rendered = match value {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    params.insert(option.field_name.clone(), rendered);
                }
            }
        }
        params
    }
}
