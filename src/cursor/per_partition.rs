//! Per-partition cursor with a bounded registry

use super::datetime::DatetimeCursor;
use super::Cursor;
use crate::error::Result;
use crate::partition::{Partition, PartitionRouter};
use crate::state::{PartitionCursorState, PartitionedState};
use crate::types::{JsonObject, JsonValue, Record, StreamSlice, StringMap};
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Default bound on concurrently tracked partitions
pub const DEFAULT_MAX_PARTITIONS: usize = 10_000;

/// Builds one datetime cursor per partition from a prototype, seeding each
/// from that partition's persisted cursor mapping.
#[derive(Debug, Clone)]
pub struct CursorFactory {
    prototype: DatetimeCursor,
}

impl CursorFactory {
    /// Create a factory from an unseeded prototype cursor
    pub fn new(prototype: DatetimeCursor) -> Self {
        Self { prototype }
    }

    /// The unseeded prototype (shared request options and formats)
    pub fn prototype(&self) -> &DatetimeCursor {
        &self.prototype
    }

    /// Build a cursor, seeded when a persisted mapping exists
    pub fn create(&self, seed: Option<&JsonObject>) -> Result<DatetimeCursor> {
        match seed {
            Some(cursor) => self
                .prototype
                .clone()
                .with_state(&JsonValue::Object(cursor.clone())),
            None => Ok(self.prototype.clone()),
        }
    }
}

/// Tracks an independent datetime cursor for every partition a router
/// enumerates.
///
/// The number of partitions is unbounded relative to memory, so the
/// registry holds at most `max_partitions` live cursors in FIFO order.
/// Opening one more evicts the oldest: its state snapshot moves to a
/// finalized list that [`stream_state`](Cursor::stream_state) still
/// merges in, so the last known cursor value for an evicted partition
/// survives. A later sync may re-read some of that partition's data; it
/// never skips any.
pub struct PerPartitionCursor {
    router: Box<dyn PartitionRouter>,
    cursor_factory: CursorFactory,
    cursors: HashMap<String, DatetimeCursor>,
    partitions: HashMap<String, JsonObject>,
    open_order: VecDeque<String>,
    finalized: Vec<PartitionCursorState>,
    seeded: PartitionedState,
    max_partitions: usize,
}

impl PerPartitionCursor {
    /// Create a per-partition cursor
    pub fn new(router: Box<dyn PartitionRouter>, cursor_factory: CursorFactory) -> Self {
        Self {
            router,
            cursor_factory,
            cursors: HashMap::new(),
            partitions: HashMap::new(),
            open_order: VecDeque::new(),
            finalized: Vec::new(),
            seeded: PartitionedState::new(),
            max_partitions: DEFAULT_MAX_PARTITIONS,
        }
    }

    /// Bound the registry (values below one are clamped to one)
    #[must_use]
    pub fn with_max_partitions(mut self, max: usize) -> Self {
        self.max_partitions = max.max(1);
        self
    }

    /// Seed from a persisted `{"states": [...]}` mapping
    #[must_use]
    pub fn with_state(mut self, state: &JsonValue) -> Self {
        self.seeded = PartitionedState::from_value(state);
        self
    }

    /// Number of live cursors in the registry
    pub fn tracked_partitions(&self) -> usize {
        self.cursors.len()
    }

    fn open_partition(&mut self, partition: &Partition) -> Result<()> {
        let key = partition.key();
        if self.cursors.contains_key(&key) {
            return Ok(());
        }

        // A previously evicted partition resumes from its finalized
        // snapshot; the snapshot folds back into the live registry so the
        // emitted state never carries duplicate entries.
        let reopened = self
            .finalized
            .iter()
            .position(|s| {
                serde_json::to_string(&s.partition).unwrap_or_default() == key
            })
            .map(|pos| self.finalized.remove(pos).cursor);

        let seed = reopened.as_ref().or_else(|| self.seeded.cursor_for(&key));
        let cursor = self.cursor_factory.create(seed)?;

        if self.cursors.len() >= self.max_partitions {
            self.evict_oldest();
        }

        self.cursors.insert(key.clone(), cursor);
        self.partitions.insert(key.clone(), partition.values.clone());
        self.open_order.push_back(key);
        Ok(())
    }

    /// Cursor for a slice's partition, reopening it if the registry
    /// evicted it between slice enumeration and processing. Reopening
    /// restores the finalized snapshot, so no observation is lost.
    fn cursor_for_slice(&mut self, slice: &StreamSlice) -> Option<&mut DatetimeCursor> {
        let key = slice.partition_key();
        if !self.cursors.contains_key(&key) {
            let partition = Partition::from_values(slice.partition().clone());
            self.open_partition(&partition).ok()?;
        }
        self.cursors.get_mut(&key)
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.open_order.pop_front() else {
            return;
        };
        warn!(partition = %oldest, "partition registry full, closing out oldest partition");

        if let (Some(cursor), Some(partition)) =
            (self.cursors.remove(&oldest), self.partitions.remove(&oldest))
        {
            let state = cursor
                .stream_state()
                .as_object()
                .cloned()
                .unwrap_or_default();
            if !state.is_empty() {
                self.finalized.push(PartitionCursorState::new(partition, state));
            }
        }
    }
}

impl Cursor for PerPartitionCursor {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        let partitions = self.router.partitions()?;
        let mut slices = Vec::new();

        for partition in partitions {
            self.open_partition(&partition)?;
            let key = partition.key();
            let cursor = self
                .cursors
                .get_mut(&key)
                .expect("partition was just opened");

            for window in cursor.stream_slices()? {
                slices.push(StreamSlice::new(
                    partition.values.clone(),
                    window.cursor_slice().clone(),
                ));
            }
        }
        Ok(slices)
    }

    fn observe(&mut self, slice: &StreamSlice, record: &Record) {
        if let Some(cursor) = self.cursor_for_slice(slice) {
            cursor.observe(slice, record);
        }
    }

    fn close_slice(&mut self, slice: &StreamSlice) {
        if let Some(cursor) = self.cursor_for_slice(slice) {
            cursor.close_slice(slice);
        }
    }

    fn stream_state(&self) -> JsonValue {
        let mut states = self.finalized.clone();

        for key in &self.open_order {
            if let (Some(cursor), Some(partition)) =
                (self.cursors.get(key), self.partitions.get(key))
            {
                let cursor_state = cursor
                    .stream_state()
                    .as_object()
                    .cloned()
                    .unwrap_or_default();
                if !cursor_state.is_empty() {
                    states.push(PartitionCursorState::new(partition.clone(), cursor_state));
                }
            }
        }

        PartitionedState { states }.to_value()
    }

    // Request injection reads only the slice's own window values plus the
    // shared request options, so it goes through the factory prototype.
    // That stays valid for slices whose partition was evicted.

    fn request_params(&self, slice: &StreamSlice) -> StringMap {
        let mut params = StringMap::new();
        let partition = Partition::from_values(slice.partition().clone());
        params.extend(self.router.request_params(&partition));
        params.extend(self.cursor_factory.prototype().request_params(slice));
        params
    }

    fn request_headers(&self, slice: &StreamSlice) -> StringMap {
        self.cursor_factory.prototype().request_headers(slice)
    }

    fn request_body_json(&self, slice: &StreamSlice) -> JsonObject {
        self.cursor_factory.prototype().request_body_json(slice)
    }
}

impl std::fmt::Debug for PerPartitionCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerPartitionCursor")
            .field("tracked_partitions", &self.cursors.len())
            .field("finalized", &self.finalized.len())
            .field("max_partitions", &self.max_partitions)
            .finish_non_exhaustive()
    }
}
