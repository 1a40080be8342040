//! Engine types
//!
//! Message types and statistics for the stream reader.

use crate::types::{JsonValue, Record};

/// A message emitted during a stream read
#[derive(Debug, Clone)]
pub enum Message {
    /// One extracted record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: Record,
    },
    /// State checkpoint
    State {
        /// Stream name
        stream: String,
        /// Durable state snapshot
        state: JsonValue,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

/// Log level for reader messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// General information
    Info,
    /// Warning
    Warn,
    /// Error (non-fatal)
    Error,
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: Record) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(stream: impl Into<String>, state: JsonValue) -> Self {
        Self::State {
            stream: stream.into(),
            state,
        }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create an error log
    pub fn error(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Error, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }
}

/// Statistics from one stream read
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Records emitted
    pub records_synced: usize,
    /// Slices fully processed
    pub slices_synced: usize,
    /// State checkpoints emitted
    pub checkpoints_emitted: usize,
    /// Errors encountered
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a completed slice
    pub fn add_slice(&mut self) {
        self.slices_synced += 1;
    }

    /// Add a checkpoint
    pub fn add_checkpoint(&mut self) {
        self.checkpoints_emitted += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
