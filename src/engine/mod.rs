//! Stream reader: retriever + checkpoint orchestration
//!
//! # Overview
//!
//! [`StreamReader`] is the thin driver around one stream's retriever: it
//! walks the cursor's slices in order, pulls each slice's record stream to
//! completion, and lets the [`CheckpointReader`] decide when the cursor
//! state is emitted as a durable checkpoint. Output is a sequence of
//! [`Message`]s (records, state snapshots, logs) for the surrounding sync
//! engine to forward and persist.

mod checkpoint;
mod types;

pub use checkpoint::{CheckpointPolicy, CheckpointReader, ReaderState};
pub use types::{LogLevel, Message, SyncStats};

use crate::error::Error;
use crate::retriever::Retriever;
use futures::StreamExt;
use std::time::Instant;
use tracing::info;

/// Outcome of one stream read.
///
/// A failed read keeps every message produced before the failure,
/// including state checkpoints for completed slices, which remain valid
/// for a future resumed sync.
#[derive(Debug)]
pub struct ReadResult {
    /// Everything the read produced, in order
    pub messages: Vec<Message>,
    /// The fatal error, when the stream failed mid-read
    pub failure: Option<Error>,
    /// Read statistics
    pub stats: SyncStats,
}

impl ReadResult {
    /// Whether the stream read to completion
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The records emitted, in order
    pub fn records(&self) -> Vec<&crate::types::Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record { record, .. } => Some(record),
                _ => None,
            })
            .collect()
    }

    /// The state checkpoints emitted, in order
    pub fn checkpoints(&self) -> Vec<&crate::types::JsonValue> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { state, .. } => Some(state),
                _ => None,
            })
            .collect()
    }
}

/// Drives one stream's retriever to completion
pub struct StreamReader<R: Retriever> {
    stream_name: String,
    retriever: R,
    policy: Option<CheckpointPolicy>,
}

impl<R: Retriever> StreamReader<R> {
    /// Create a reader for a stream
    pub fn new(stream_name: impl Into<String>, retriever: R) -> Self {
        Self {
            stream_name: stream_name.into(),
            retriever,
            policy: None,
        }
    }

    /// Override the checkpoint policy (default: every slice when a cursor
    /// is bound, stream end otherwise)
    #[must_use]
    pub fn with_checkpoint_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Access the retriever
    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    /// Read the stream to completion (or first fatal error)
    pub async fn read(&mut self) -> ReadResult {
        let started = Instant::now();
        let name = self.stream_name.clone();
        let policy = self.policy.unwrap_or(if self.retriever.has_cursor() {
            CheckpointPolicy::EverySlice
        } else {
            CheckpointPolicy::StreamEnd
        });

        let mut messages = vec![Message::info(format!("Starting sync for stream: {name}"))];
        let mut stats = SyncStats::new();
        let mut reader = CheckpointReader::new(policy);

        let slices = match self.retriever.stream_slices() {
            Ok(slices) => slices,
            Err(e) => {
                messages.push(Message::error(format!(
                    "Stream '{name}' failed to build slices: {e}"
                )));
                stats.add_error();
                return ReadResult {
                    messages,
                    failure: Some(e),
                    stats,
                };
            }
        };

        for (index, slice) in slices.iter().enumerate() {
            reader.start_slice(index);

            let mut failure = None;
            {
                let mut records = self.retriever.read_records(slice);
                while let Some(result) = records.next().await {
                    match result {
                        Ok(record) => {
                            stats.add_records(1);
                            reader.observe_record();
                            messages.push(Message::record(&name, record));
                        }
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }

            if let Some(e) = failure {
                stats.add_error();
                stats.set_duration(started.elapsed().as_millis() as u64);
                messages.push(Message::error(format!(
                    "Stream '{name}' failed in slice {slice}: {e}"
                )));
                let failure = Error::stream_failure(&name, slice.to_string(), e.to_string());
                return ReadResult {
                    messages,
                    failure: Some(failure),
                    stats,
                };
            }

            stats.add_slice();
            if reader.slice_complete() {
                stats.add_checkpoint();
                messages.push(Message::state(&name, self.retriever.stream_state()));
            }
        }

        if reader.finish() {
            stats.add_checkpoint();
            messages.push(Message::state(&name, self.retriever.stream_state()));
        }

        stats.set_duration(started.elapsed().as_millis() as u64);
        info!(
            stream = %name,
            records = stats.records_synced,
            slices = stats.slices_synced,
            "completed stream read"
        );
        messages.push(Message::info(format!(
            "Completed sync for {name}: {} records in {} slices",
            stats.records_synced, stats.slices_synced
        )));

        ReadResult {
            messages,
            failure: None,
            stats,
        }
    }

    fn retriever_state_snapshot(&self) -> crate::types::JsonValue {
        self.retriever.stream_state()
    }
}

#[cfg(test)]
mod tests;
