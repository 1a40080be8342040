//! Cursors: incremental-sync progress and windowing
//!
//! # Overview
//!
//! A cursor owns what has already been synced and how future work is cut
//! into slices:
//!
//! - [`DatetimeCursor`] walks a date range in fixed windows and tracks the
//!   high-water mark of observed records.
//! - [`PerPartitionCursor`] runs one datetime cursor per parent partition
//!   behind a bounded registry.
//! - [`GlobalSubstreamCursor`] shares a single cursor across all
//!   partitions, trading possible re-reads for bounded state.
//!
//! Cursors are single-writer: the retriever bound to a cursor is the only
//! thing that calls its mutating operations, in strict
//! slice-then-observe-then-close order.

mod datetime;
mod global;
mod per_partition;

pub use datetime::{DatetimeCursor, StepDuration, END_TIME_FIELD, START_TIME_FIELD};
pub use global::{GlobalCursorPolicy, GlobalSubstreamCursor};
pub use per_partition::{CursorFactory, PerPartitionCursor, DEFAULT_MAX_PARTITIONS};

use crate::error::Result;
use crate::types::{JsonObject, JsonValue, Record, StreamSlice, StringMap};

/// Owns incremental-sync state and slicing for one stream.
///
/// `stream_slices` advances internal bookkeeping as a side effect; a
/// cursor instance covers one sync, and idempotent re-reads construct a
/// fresh cursor from persisted state.
pub trait Cursor: Send + Sync {
    /// Produce this sync's slices, in processing order
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>>;

    /// Note one record read from a slice.
    ///
    /// Records whose cursor field does not parse are skipped for
    /// advancement but still emitted by the retriever.
    fn observe(&mut self, slice: &StreamSlice, record: &Record);

    /// Mark a slice fully read and fold its progress into durable state
    fn close_slice(&mut self, slice: &StreamSlice);

    /// Snapshot of the durable state, safe to call at any point
    fn stream_state(&self) -> JsonValue;

    /// Query parameter fragment for requests within a slice
    fn request_params(&self, _slice: &StreamSlice) -> StringMap {
        StringMap::new()
    }

    /// Header fragment for requests within a slice
    fn request_headers(&self, _slice: &StreamSlice) -> StringMap {
        StringMap::new()
    }

    /// JSON body fragment for requests within a slice
    fn request_body_json(&self, _slice: &StreamSlice) -> JsonObject {
        JsonObject::new()
    }
}
