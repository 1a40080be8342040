//! Shared cursor across all partitions of a substream

use super::datetime::{DatetimeCursor, END_TIME_FIELD};
use super::Cursor;
use crate::error::Result;
use crate::partition::{Partition, PartitionRouter};
use crate::state::GlobalState;
use crate::types::{JsonObject, JsonValue, Record, StreamSlice, StringMap};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// How per-partition progress folds into the single emitted cursor value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobalCursorPolicy {
    /// Minimum over all partitions of the last fully-closed window end.
    /// Never skips a partition's data on resume; re-reads are possible.
    #[default]
    MinimumClosedWindow,
    /// Advance only once the entire sweep (every partition, every window)
    /// completes, jumping to the sweep end. Coarser checkpoints, fewer
    /// partial-progress re-reads on a clean finish.
    SweepEnd,
}

/// One cursor shared by every partition of a substream.
///
/// Used when parent records are numerous enough that per-partition state
/// would be unbounded. Partition identity is ignored for state
/// advancement; the emitted value is folded from window completions per
/// the configured [`GlobalCursorPolicy`]. The resulting duplicate-read
/// trade-off is deliberate: resuming from the folded value may re-read
/// data for partitions that were already ahead of it.
pub struct GlobalSubstreamCursor {
    router: Box<dyn PartitionRouter>,
    inner: DatetimeCursor,
    policy: GlobalCursorPolicy,
    progress: HashMap<String, DateTime<Utc>>,
    partition_count: usize,
    total_slices: usize,
    closed_slices: usize,
    sweep_end: Option<DateTime<Utc>>,
    global: Option<DateTime<Utc>>,
}

impl GlobalSubstreamCursor {
    /// Create a global substream cursor around a shared datetime cursor
    pub fn new(router: Box<dyn PartitionRouter>, inner: DatetimeCursor) -> Self {
        Self {
            router,
            inner,
            policy: GlobalCursorPolicy::default(),
            progress: HashMap::new(),
            partition_count: 0,
            total_slices: 0,
            closed_slices: 0,
            sweep_end: None,
            global: None,
        }
    }

    /// Set the progress-folding policy
    #[must_use]
    pub fn with_policy(mut self, policy: GlobalCursorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Seed from a persisted mapping: either the marked global shape or a
    /// flat `{<cursor_field>: <value>}` mapping
    pub fn with_state(mut self, state: &JsonValue) -> Result<Self> {
        let flat = if state.get("uses_global_cursor").is_some() {
            JsonValue::Object(GlobalState::from_value(state).state)
        } else {
            state.clone()
        };

        self.inner = self.inner.with_state(&flat)?;
        if let Some(value) = flat.get(self.inner.cursor_field()) {
            if let Some(raw) = value.as_str() {
                self.global = Some(self.inner.parse_datetime(raw)?);
            }
        }
        Ok(self)
    }

    fn fold_progress(&mut self) {
        match self.policy {
            GlobalCursorPolicy::MinimumClosedWindow => {
                // Only meaningful once every partition has closed at least
                // one window; before that the minimum would skip the
                // partitions that have not started.
                if self.partition_count == 0 || self.progress.len() < self.partition_count {
                    return;
                }
                if let Some(candidate) = self.progress.values().min().copied() {
                    if self.global.is_none_or(|g| candidate > g) {
                        self.global = Some(candidate);
                    }
                }
            }
            GlobalCursorPolicy::SweepEnd => {
                if self.total_slices > 0 && self.closed_slices == self.total_slices {
                    if let Some(end) = self.sweep_end {
                        if self.global.is_none_or(|g| end > g) {
                            self.global = Some(end);
                        }
                    }
                }
            }
        }
    }
}

impl Cursor for GlobalSubstreamCursor {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        let partitions = self.router.partitions()?;
        let windows = self.inner.stream_slices()?;

        self.partition_count = partitions.len();
        self.total_slices = partitions.len() * windows.len();
        self.sweep_end = windows
            .last()
            .and_then(|w| w.get(END_TIME_FIELD))
            .and_then(JsonValue::as_str)
            .and_then(|s| self.inner.parse_datetime(s).ok());

        let mut slices = Vec::with_capacity(self.total_slices);
        for partition in &partitions {
            for window in &windows {
                slices.push(StreamSlice::new(
                    partition.values.clone(),
                    window.cursor_slice().clone(),
                ));
            }
        }
        Ok(slices)
    }

    fn observe(&mut self, _slice: &StreamSlice, _record: &Record) {
        // Record values do not advance the shared cursor; only window
        // completion does, so a straggling partition can never be skipped.
    }

    fn close_slice(&mut self, slice: &StreamSlice) {
        let Some(end) = slice
            .get(END_TIME_FIELD)
            .and_then(JsonValue::as_str)
            .and_then(|s| self.inner.parse_datetime(s).ok())
        else {
            debug!("slice has no parseable window end, not counted toward global progress");
            return;
        };

        let key = slice.partition_key();
        let entry = self.progress.entry(key).or_insert(end);
        if end > *entry {
            *entry = end;
        }
        self.closed_slices += 1;

        self.fold_progress();
    }

    fn stream_state(&self) -> JsonValue {
        let mut cursor = JsonObject::new();
        if let Some(global) = self.global {
            cursor.insert(
                self.inner.cursor_field().to_string(),
                JsonValue::String(self.inner.format_datetime(global)),
            );
        }
        GlobalState::new(cursor).to_value()
    }

    fn request_params(&self, slice: &StreamSlice) -> StringMap {
        let mut params = StringMap::new();
        let partition = Partition::from_values(slice.partition().clone());
        params.extend(self.router.request_params(&partition));
        params.extend(self.inner.request_params(slice));
        params
    }

    fn request_headers(&self, slice: &StreamSlice) -> StringMap {
        self.inner.request_headers(slice)
    }

    fn request_body_json(&self, slice: &StreamSlice) -> JsonObject {
        self.inner.request_body_json(slice)
    }
}

impl std::fmt::Debug for GlobalSubstreamCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalSubstreamCursor")
            .field("policy", &self.policy)
            .field("partition_count", &self.partition_count)
            .field("closed_slices", &self.closed_slices)
            .finish_non_exhaustive()
    }
}
