//! Tests for engine module

use super::*;
use crate::error::{Error, Result};
use crate::retriever::Retriever;
use crate::types::{JsonValue, Record, StreamSlice};
use futures::stream::{self, BoxStream};
use serde_json::json;

// ============================================================================
// Mock Retriever
// ============================================================================

/// Scripted retriever: fixed slices, fixed records per slice, fixed state
struct MockRetriever {
    slices: Vec<StreamSlice>,
    records_per_slice: Vec<Vec<Record>>,
    fail_at_slice: Option<usize>,
    state: JsonValue,
    has_cursor: bool,
}

impl MockRetriever {
    fn new(records_per_slice: Vec<Vec<Record>>, state: JsonValue, has_cursor: bool) -> Self {
        let slices = (0..records_per_slice.len())
            .map(|i| {
                StreamSlice::from_partition(
                    json!({"index": i}).as_object().cloned().unwrap(),
                )
            })
            .collect();
        Self {
            slices,
            records_per_slice,
            fail_at_slice: None,
            state,
            has_cursor,
        }
    }

    fn failing_at(mut self, slice: usize) -> Self {
        self.fail_at_slice = Some(slice);
        self
    }
}

impl Retriever for MockRetriever {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        Ok(self.slices.clone())
    }

    fn read_records<'a>(&'a mut self, slice: &StreamSlice) -> BoxStream<'a, Result<Record>> {
        let index = self
            .slices
            .iter()
            .position(|s| s == slice)
            .expect("unknown slice");

        let mut results: Vec<Result<Record>> = self.records_per_slice[index]
            .iter()
            .cloned()
            .map(Ok)
            .collect();
        if self.fail_at_slice == Some(index) {
            results.push(Err(Error::config("simulated failure")));
        }
        Box::pin(stream::iter(results))
    }

    fn stream_state(&self) -> JsonValue {
        self.state.clone()
    }

    fn has_cursor(&self) -> bool {
        self.has_cursor
    }
}

// ============================================================================
// CheckpointReader Tests
// ============================================================================

#[test]
fn test_checkpoint_reader_state_machine() {
    let mut reader = CheckpointReader::new(CheckpointPolicy::EverySlice);
    assert_eq!(reader.state(), ReaderState::NotStarted);

    reader.start_slice(0);
    assert_eq!(reader.state(), ReaderState::ProcessingSlice(0));

    assert!(reader.slice_complete());
    assert_eq!(reader.state(), ReaderState::SliceComplete(0));

    reader.start_slice(1);
    assert!(reader.slice_complete());

    assert!(!reader.finish());
    assert_eq!(reader.state(), ReaderState::Done);
    assert_eq!(reader.checkpoints_emitted(), 2);
}

#[test]
fn test_checkpoint_every_slice_policy() {
    let mut reader = CheckpointReader::new(CheckpointPolicy::EverySlice);
    reader.start_slice(0);
    // Zero-record slices still checkpoint
    assert!(reader.slice_complete());
}

#[test]
fn test_checkpoint_stream_end_policy() {
    let mut reader = CheckpointReader::new(CheckpointPolicy::StreamEnd);
    reader.start_slice(0);
    reader.observe_record();
    assert!(!reader.slice_complete());
    assert!(reader.finish());
    assert_eq!(reader.checkpoints_emitted(), 1);
}

#[test]
fn test_checkpoint_every_n_records_policy() {
    let mut reader = CheckpointReader::new(CheckpointPolicy::EveryNRecords(3));

    reader.start_slice(0);
    reader.observe_record();
    reader.observe_record();
    assert!(!reader.slice_complete()); // only 2 since last checkpoint

    reader.start_slice(1);
    reader.observe_record();
    assert!(reader.slice_complete()); // 3 accumulated across slices

    reader.start_slice(2);
    assert!(!reader.slice_complete()); // counter was reset
}

#[test]
fn test_finish_guarantees_one_checkpoint() {
    // Zero slices processed: finish must still checkpoint once
    let mut reader = CheckpointReader::new(CheckpointPolicy::EverySlice);
    assert!(reader.finish());
    assert_eq!(reader.checkpoints_emitted(), 1);
}

// ============================================================================
// StreamReader Tests
// ============================================================================

#[tokio::test]
async fn test_reader_checkpoints_after_every_slice_with_cursor() {
    let retriever = MockRetriever::new(
        vec![vec![json!({"id": 1})], vec![json!({"id": 2})]],
        json!({"updated": "2024-01-05"}),
        true,
    );
    let mut reader = StreamReader::new("users", retriever);

    let result = reader.read().await;
    assert!(result.is_success());
    assert_eq!(result.records().len(), 2);
    assert_eq!(result.checkpoints().len(), 2);
    assert_eq!(result.stats.slices_synced, 2);
}

#[tokio::test]
async fn test_reader_full_refresh_checkpoints_once_at_end() {
    let retriever = MockRetriever::new(
        vec![vec![json!({"id": 1}), json!({"id": 2})]],
        json!({}),
        false,
    );
    let mut reader = StreamReader::new("users", retriever);

    let result = reader.read().await;
    assert!(result.is_success());
    assert_eq!(result.checkpoints().len(), 1);

    // The single checkpoint is the last message before the closing log
    let last_state_position = result
        .messages
        .iter()
        .rposition(Message::is_state)
        .unwrap();
    let last_record_position = result
        .messages
        .iter()
        .rposition(Message::is_record)
        .unwrap();
    assert!(last_state_position > last_record_position);
}

#[tokio::test]
async fn test_zero_record_sync_still_emits_one_checkpoint() {
    let before = json!({"updated": "2024-01-05"});
    let retriever = MockRetriever::new(vec![vec![], vec![]], before.clone(), true);
    let mut reader = StreamReader::new("users", retriever);

    let result = reader.read().await;
    assert!(result.is_success());
    assert!(result.records().is_empty());

    // Slice-granular policy checkpoints each empty slice; state is unchanged
    let checkpoints = result.checkpoints();
    assert!(!checkpoints.is_empty());
    for state in checkpoints {
        assert_eq!(*state, before);
    }
}

#[tokio::test]
async fn test_zero_slice_sync_still_emits_one_checkpoint() {
    let before = json!({"updated": "2024-01-05"});
    let retriever = MockRetriever::new(vec![], before.clone(), true);
    let mut reader = StreamReader::new("users", retriever);

    let result = reader.read().await;
    assert!(result.is_success());
    assert_eq!(result.checkpoints().len(), 1);
    assert_eq!(*result.checkpoints()[0], before);
}

#[tokio::test]
async fn test_failure_keeps_checkpoints_of_completed_slices() {
    let retriever = MockRetriever::new(
        vec![vec![json!({"id": 1})], vec![json!({"id": 2})]],
        json!({"updated": "2024-01-03"}),
        true,
    )
    .failing_at(1);
    let mut reader = StreamReader::new("users", retriever);

    let result = reader.read().await;
    assert!(!result.is_success());
    assert!(matches!(result.failure, Some(Error::StreamFailure { .. })));

    // Slice 0 checkpointed before slice 1 failed
    assert_eq!(result.checkpoints().len(), 1);

    // The error message names the stream and the slice
    let error_log = result
        .messages
        .iter()
        .find_map(|m| match m {
            Message::Log {
                level: LogLevel::Error,
                message,
            } => Some(message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(error_log.contains("users"));
    assert!(error_log.contains("index"));
}

#[tokio::test]
async fn test_every_n_records_policy_via_reader() {
    let retriever = MockRetriever::new(
        vec![
            vec![json!({"id": 1}), json!({"id": 2})],
            vec![json!({"id": 3})],
            vec![],
        ],
        json!({"cursor": "x"}),
        true,
    );
    let mut reader = StreamReader::new("users", retriever)
        .with_checkpoint_policy(CheckpointPolicy::EveryNRecords(2));

    let result = reader.read().await;
    assert!(result.is_success());
    // Slice 0 hits the 2-record threshold; slices 1 and 2 accumulate only
    // one record total, so the final checkpoint comes from finish()
    assert_eq!(result.checkpoints().len(), 1 + 1);
}

#[tokio::test]
async fn test_message_helpers() {
    let record = Message::record("s", json!({"a": 1}));
    assert!(record.is_record());
    assert!(!record.is_state());

    let state = Message::state("s", json!({}));
    assert!(state.is_state());

    let log = Message::info("hello");
    assert!(log.is_log());
}
