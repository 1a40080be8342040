//! Partition router implementations
//!
//! Each router handles a specific partitioning source.

use super::types::{Partition, PartitionRouter};
use crate::decode::extract_path;
use crate::error::Result;
use crate::types::{JsonValue, RequestOption};
use std::collections::HashSet;

// ============================================================================
// List Router
// ============================================================================

/// Partitions from a static list of values
#[derive(Debug, Clone)]
pub struct ListRouter {
    /// List of partition values
    values: Vec<String>,
    /// Field name for the partition zone
    partition_field: String,
    /// Optional request injection for the partition value
    request_option: Option<RequestOption>,
}

impl ListRouter {
    /// Create a new list router
    pub fn new(values: Vec<String>, partition_field: impl Into<String>) -> Self {
        Self {
            values,
            partition_field: partition_field.into(),
            request_option: None,
        }
    }

    /// Inject the partition value into requests
    #[must_use]
    pub fn with_request_option(mut self, option: RequestOption) -> Self {
        self.request_option = Some(option);
        self
    }
}

impl PartitionRouter for ListRouter {
    fn partitions(&self) -> Result<Vec<Partition>> {
        Ok(self
            .values
            .iter()
            .map(|v| Partition::new().with_value(self.partition_field.clone(), v.clone()))
            .collect())
    }

    fn request_option(&self) -> Option<&RequestOption> {
        self.request_option.as_ref()
    }
}

// ============================================================================
// Parent Router
// ============================================================================

/// Partitions from records of a parent stream.
///
/// Each parent record contributes one partition, keyed by a dotted-path
/// field of the record; duplicates are collapsed. Zero parent records is a
/// valid outcome and yields zero partitions.
#[derive(Debug, Clone)]
pub struct ParentRouter {
    /// Records from the parent stream
    parent_records: Vec<JsonValue>,
    /// Dotted path to the key within parent records
    parent_key: String,
    /// Field name for the partition zone
    partition_field: String,
    /// Optional request injection for the partition value
    request_option: Option<RequestOption>,
}

impl ParentRouter {
    /// Create a new parent router
    pub fn new(
        parent_records: Vec<JsonValue>,
        parent_key: impl Into<String>,
        partition_field: impl Into<String>,
    ) -> Self {
        Self {
            parent_records,
            parent_key: parent_key.into(),
            partition_field: partition_field.into(),
            request_option: None,
        }
    }

    /// Inject the partition value into requests
    #[must_use]
    pub fn with_request_option(mut self, option: RequestOption) -> Self {
        self.request_option = Some(option);
        self
    }

    /// Replace the parent records (for deferred parent reads)
    pub fn set_records(&mut self, records: Vec<JsonValue>) {
        self.parent_records = records;
    }

    fn extract_key(&self, record: &JsonValue) -> Option<String> {
        match extract_path(record, &self.parent_key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl PartitionRouter for ParentRouter {
    fn partitions(&self) -> Result<Vec<Partition>> {
        let mut partitions = Vec::new();
        let mut seen = HashSet::new();

        for record in &self.parent_records {
            if let Some(key_value) = self.extract_key(record) {
                if seen.insert(key_value.clone()) {
                    partitions.push(
                        Partition::new().with_value(self.partition_field.clone(), key_value),
                    );
                }
            }
        }

        Ok(partitions)
    }

    fn request_option(&self) -> Option<&RequestOption> {
        self.request_option.as_ref()
    }
}
