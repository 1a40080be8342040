//! Response decoding and record selection
//!
//! Supports: JSON, JSONL
//!
//! # Overview
//!
//! Two seams live here. [`RecordDecoder`] parses a raw response body into
//! records (used by the async retriever when it downloads job output).
//! [`RecordSelector`] pulls records out of an already-decoded JSON body
//! (used by the simple retriever on every page).

mod decoders;
mod types;

pub use decoders::{FieldPathSelector, JsonDecoder, JsonlDecoder};
pub use types::{extract_path, RecordDecoder, RecordSelector};
