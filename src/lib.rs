//! # Syncline
//!
//! A Rust-native retrieval and incremental-sync engine for HTTP data
//! source connectors: the retriever, cursor, pagination and checkpoint
//! machinery that a stream-reading driver composes into a running
//! extraction pipeline.
//!
//! ## Features
//!
//! - **Paged Retrieval**: cursor, offset and page-number pagination with
//!   configurable request injection
//! - **Incremental Sync**: datetime-window cursors with lookback,
//!   per-partition tracking and a bounded partition registry
//! - **Async Job Extraction**: submit/poll/download retrieval for bulk
//!   export APIs, with guaranteed job release
//! - **Slice-Granular Checkpointing**: state snapshots at safe boundaries,
//!   including the zero-record case
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use syncline::cursor::DatetimeCursor;
//! use syncline::decode::FieldPathSelector;
//! use syncline::engine::StreamReader;
//! use syncline::http::{HttpRequester, HttpRequesterConfig, RequestSpec};
//! use syncline::retriever::SimpleRetriever;
//! use syncline::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let requester = Arc::new(HttpRequester::with_config(
//!         HttpRequesterConfig::with_base_url("https://api.example.com"),
//!     ));
//!
//!     let cursor = DatetimeCursor::new("2024-01-01", "updated_at", "%Y-%m-%d")?
//!         .with_step("P10D", "P1D")?;
//!
//!     let retriever = SimpleRetriever::new(
//!         "users",
//!         requester,
//!         RequestSpec::get("/users"),
//!         Box::new(FieldPathSelector::with_path("data")),
//!     )
//!     .with_cursor(Box::new(cursor));
//!
//!     let mut reader = StreamReader::new("users", retriever);
//!     let result = reader.read().await;
//!     for message in result.messages {
//!         // Forward records, persist state checkpoints
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        StreamReader                             │
//! │   slices in cursor order → records per slice → checkpoints      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬────────────┬──────┴──────┬────────────┬─────────────┐
//! │  Cursor  │ Retriever  │  Paginate   │    HTTP    │ Checkpoint  │
//! ├──────────┼────────────┼─────────────┼────────────┼─────────────┤
//! │ Datetime │ Simple     │ Cursor      │ Requester  │ Every slice │
//! │ Per-Part │ Async Job  │ Offset      │ Classify   │ N records   │
//! │ Global   │            │ Page Number │ Backoff    │ Stream end  │
//! └──────────┴────────────┴─────────────┴────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the engine
pub mod error;

/// Common types and type aliases
pub mod types;

/// Response decoding and record selection
pub mod decode;

/// HTTP requester, rate limiting and error classification
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Partition routing
pub mod partition;

/// Incremental cursors
pub mod cursor;

/// State shapes and migrations
pub mod state;

/// Simple and async-job retrievers
pub mod retriever;

/// Stream reading and checkpointing
pub mod engine;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
