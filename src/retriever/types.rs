//! Retriever trait, shared configuration, and the classified send loop

use crate::error::{Error, Result};
use crate::http::{
    BackoffStrategy, DecodedResponse, ErrorHandler, Requester, RequestSpec, ResponseAction,
};
use crate::types::{JsonValue, Record, StreamSlice};
use futures::stream::BoxStream;
use tracing::warn;

/// Turns stream slices into lazy record sequences.
///
/// `read_records` returns a single-pass, non-restartable stream; cursor
/// state advances as records are pulled, so draining only part of the
/// stream leaves state reflecting only the records actually seen. That
/// partial-consumption behavior is part of the contract.
pub trait Retriever: Send {
    /// This sync's slices, delegated to the bound cursor (a single
    /// full-refresh slice when no cursor is bound)
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>>;

    /// Lazily read all records of one slice
    fn read_records<'a>(&'a mut self, slice: &StreamSlice) -> BoxStream<'a, Result<Record>>;

    /// Current durable state snapshot of the bound cursor
    fn stream_state(&self) -> JsonValue;

    /// Whether a cursor is bound (drives the checkpoint policy)
    fn has_cursor(&self) -> bool;
}

/// Shared retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Cap on pages fetched per slice (preview/test reads); None is unbounded
    pub max_pages: Option<usize>,
    /// Cap on records read across the whole stream; None is unbounded
    pub max_records: Option<usize>,
    /// Retry attempts per request after the first send
    pub max_retries: u32,
    /// Delay progression between retries
    pub backoff: BackoffStrategy,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_records: None,
            max_retries: 3,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl RetrieverConfig {
    /// Create a default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap pages per slice
    #[must_use]
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Cap records per stream
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the backoff strategy
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Send a request under the error handler's authority.
///
/// `Retry` classifications back off and resend up to `max_retries` times;
/// `Fail` propagates; `Ignore` returns `Ok(None)`, which callers treat as
/// an empty page. The classification, not the raw status, decides.
pub async fn send_with_policy(
    requester: &dyn Requester,
    error_handler: &dyn ErrorHandler,
    config: &RetrieverConfig,
    request: &RequestSpec,
) -> Result<Option<DecodedResponse>> {
    let mut attempt: u32 = 0;

    loop {
        let outcome = requester.send(request).await;

        match error_handler.classify(&outcome) {
            ResponseAction::Success => match outcome {
                Ok(response) => return Ok(Some(response)),
                // A handler classifying an Err as Success is a handler bug;
                // surface the underlying error rather than panicking.
                Err(e) => return Err(e),
            },
            ResponseAction::Ignore => return Ok(None),
            ResponseAction::Fail => {
                return Err(match outcome {
                    Err(e) => e,
                    Ok(response) => {
                        let body: String = response.text.chars().take(200).collect();
                        Error::http_status(response.status, body)
                    }
                });
            }
            ResponseAction::Retry { backoff } => {
                if attempt >= config.max_retries {
                    return Err(match outcome {
                        Err(e) => e,
                        Ok(_) => Error::MaxRetriesExceeded {
                            max_retries: config.max_retries,
                        },
                    });
                }
                let delay = backoff.unwrap_or_else(|| config.backoff.delay(attempt));
                warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
