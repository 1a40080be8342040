//! Decoder and selector traits
//!
//! Defines the core record-extraction abstractions.

use crate::error::Result;
use crate::types::Record;
use serde_json::Value;

/// Parses a raw response body into records
pub trait RecordDecoder: Send + Sync {
    /// Decode the body into a list of records
    fn decode(&self, body: &str) -> Result<Vec<Record>>;
}

/// Selects records out of a decoded JSON response body
pub trait RecordSelector: Send + Sync {
    /// Select records from the body
    fn select(&self, body: &Value) -> Result<Vec<Record>>;
}

/// Extract a value from JSON using a dotted path (e.g. "data.items",
/// "records[0].id"). Array indexing via brackets is supported.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let key = &part[..bracket_pos];
            let idx_str = part.get(bracket_pos + 1..part.len() - 1)?;

            if !key.is_empty() {
                current = current.get(key)?;
            }
            let idx: usize = idx_str.parse().ok()?;
            current = current.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current)
}
