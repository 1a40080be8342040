//! Common types used throughout syncline
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// A single extracted record
pub type Record = serde_json::Value;

// ============================================================================
// Stream Slice
// ============================================================================

/// One unit of work for a retriever: a partition paired with a cursor window.
///
/// The `partition` zone identifies a parent entity (e.g. an account id), the
/// `cursor_slice` zone identifies a position window within that partition
/// (e.g. `{start_time, end_time}`). A slice is immutable once built; it is
/// produced by a cursor and consumed exactly once by a retriever.
#[derive(Debug, Clone, Default)]
pub struct StreamSlice {
    partition: JsonObject,
    cursor_slice: JsonObject,
}

impl StreamSlice {
    /// Create a slice from both zones
    pub fn new(partition: JsonObject, cursor_slice: JsonObject) -> Self {
        Self {
            partition,
            cursor_slice,
        }
    }

    /// Create a slice with only a cursor window (no partitioning)
    pub fn from_cursor_window(cursor_slice: JsonObject) -> Self {
        Self {
            partition: JsonObject::new(),
            cursor_slice,
        }
    }

    /// Create a slice with only a partition (no cursor window)
    pub fn from_partition(partition: JsonObject) -> Self {
        Self {
            partition,
            cursor_slice: JsonObject::new(),
        }
    }

    /// The partition zone
    pub fn partition(&self) -> &JsonObject {
        &self.partition
    }

    /// The cursor window zone
    pub fn cursor_slice(&self) -> &JsonObject {
        &self.cursor_slice
    }

    /// Look up a key, checking the cursor window first, then the partition
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.cursor_slice
            .get(key)
            .or_else(|| self.partition.get(key))
    }

    /// Check whether both zones are empty (a full-refresh slice)
    pub fn is_empty(&self) -> bool {
        self.partition.is_empty() && self.cursor_slice.is_empty()
    }

    /// Canonical string key for the partition zone.
    ///
    /// serde_json maps are key-ordered, so the rendering is stable and two
    /// partitions with the same entries always produce the same key.
    pub fn partition_key(&self) -> String {
        serde_json::to_string(&self.partition).unwrap_or_default()
    }

    /// The combined mapping as a single JSON object
    pub fn to_value(&self) -> JsonValue {
        let mut combined = self.partition.clone();
        for (k, v) in &self.cursor_slice {
            combined.insert(k.clone(), v.clone());
        }
        JsonValue::Object(combined)
    }
}

impl PartialEq for StreamSlice {
    fn eq(&self, other: &Self) -> bool {
        self.partition == other.partition && self.cursor_slice == other.cursor_slice
    }
}

impl Eq for StreamSlice {}

impl Hash for StreamSlice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.partition_key().hash(state);
        serde_json::to_string(&self.cursor_slice)
            .unwrap_or_default()
            .hash(state);
    }
}

impl fmt::Display for StreamSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

// ============================================================================
// Request Option
// ============================================================================

/// Which component of the outgoing request a value is injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOptionType {
    /// A query parameter
    RequestParameter,
    /// A request header
    Header,
    /// A field in the JSON request body
    BodyJson,
    /// A path segment (replaces the request path)
    Path,
}

/// Declares where and under what name a value (page token, window bound)
/// is attached to the next outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOption {
    /// Request component to inject into
    pub inject_into: RequestOptionType,
    /// Key name within that component (ignored for `Path`)
    pub field_name: String,
}

impl RequestOption {
    /// Create a new request option
    pub fn new(inject_into: RequestOptionType, field_name: impl Into<String>) -> Self {
        Self {
            inject_into,
            field_name: field_name.into(),
        }
    }

    /// Inject as a query parameter
    pub fn request_parameter(field_name: impl Into<String>) -> Self {
        Self::new(RequestOptionType::RequestParameter, field_name)
    }

    /// Inject as a header
    pub fn header(field_name: impl Into<String>) -> Self {
        Self::new(RequestOptionType::Header, field_name)
    }

    /// Inject as a JSON body field
    pub fn body_json(field_name: impl Into<String>) -> Self {
        Self::new(RequestOptionType::BodyJson, field_name)
    }

    /// Inject as the request path
    pub fn path() -> Self {
        Self::new(RequestOptionType::Path, "")
    }
}

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full refresh - fetch all data every time
    #[default]
    FullRefresh,
    /// Incremental - only fetch new/updated data
    Incremental,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}
