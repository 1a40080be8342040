//! Decoder and selector implementations
//!
//! Each decoder handles a specific response format.

use super::types::{extract_path, RecordDecoder, RecordSelector};
use crate::error::{Error, Result};
use crate::types::Record;
use serde_json::Value;

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Dotted path to the record array within the body
    record_path: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Record>> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;
        let selector = FieldPathSelector {
            record_path: self.record_path.clone(),
        };
        selector.select(&value)
    }
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    /// Create a new JSONL decoder
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Record>> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| Error::Decode {
                    message: format!("Failed to parse JSONL line: {e}"),
                })
            })
            .collect()
    }
}

// ============================================================================
// Field Path Selector
// ============================================================================

/// Selects the record array at a dotted path in a decoded body.
///
/// With no path, an array body is taken as the records and any other body
/// becomes a single record. A missing path yields zero records rather than
/// an error, since many APIs omit the field on empty pages.
#[derive(Debug, Clone, Default)]
pub struct FieldPathSelector {
    /// Dotted path to the record array
    record_path: Option<String>,
}

impl FieldPathSelector {
    /// Create a selector that treats the whole body as the records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }
}

impl RecordSelector for FieldPathSelector {
    fn select(&self, body: &Value) -> Result<Vec<Record>> {
        let target = match &self.record_path {
            Some(path) => match extract_path(body, path) {
                Some(v) => v,
                None => return Ok(Vec::new()),
            },
            None => body,
        };

        match target {
            Value::Array(arr) => Ok(arr.clone()),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other.clone()]),
        }
    }
}
