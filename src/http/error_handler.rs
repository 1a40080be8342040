//! Response classification and retry backoff
//!
//! The retriever never looks at raw status codes. Every send outcome is
//! classified into a [`ResponseAction`], and that action alone drives the
//! retry loop.

use super::types::DecodedResponse;
use crate::error::Result;
use crate::types::BackoffType;
use std::time::Duration;

/// What the retriever should do with a send outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseAction {
    /// Process the response as a normal page
    Success,
    /// Back off and resend, bounded by the retriever's attempt budget
    Retry {
        /// Server-supplied delay (e.g. Retry-After); None means use the
        /// configured backoff strategy
        backoff: Option<Duration>,
    },
    /// Fatal for the stream
    Fail,
    /// Treat as an empty page and stop pagination for this slice
    Ignore,
}

/// Classifies send outcomes into retry decisions
pub trait ErrorHandler: Send + Sync {
    /// Classify one outcome of [`Requester::send`](super::Requester::send)
    fn classify(&self, outcome: &Result<DecodedResponse>) -> ResponseAction;
}

/// Status-code driven classifier.
///
/// Defaults: 429 and 5xx retry (with Retry-After honored on 429), other
/// 4xx fail, transport errors retry when the error itself is retryable.
/// Statuses listed in `ignore_statuses` become empty pages, useful for
/// APIs that answer 403 on entities the credentials cannot see.
#[derive(Debug, Clone)]
pub struct DefaultErrorHandler {
    /// Statuses classified as retryable
    pub retry_statuses: Vec<u16>,
    /// Statuses classified as ignorable (empty page)
    pub ignore_statuses: Vec<u16>,
}

impl Default for DefaultErrorHandler {
    fn default() -> Self {
        Self {
            retry_statuses: vec![429, 500, 502, 503, 504],
            ignore_statuses: Vec::new(),
        }
    }
}

impl DefaultErrorHandler {
    /// Create a classifier with default status sets
    pub fn new() -> Self {
        Self::default()
    }

    /// Add statuses to treat as empty pages
    #[must_use]
    pub fn ignoring(mut self, statuses: Vec<u16>) -> Self {
        self.ignore_statuses = statuses;
        self
    }

    /// Replace the retryable status set
    #[must_use]
    pub fn retrying(mut self, statuses: Vec<u16>) -> Self {
        self.retry_statuses = statuses;
        self
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn classify(&self, outcome: &Result<DecodedResponse>) -> ResponseAction {
        match outcome {
            Ok(response) => {
                if self.ignore_statuses.contains(&response.status) {
                    return ResponseAction::Ignore;
                }
                if self.retry_statuses.contains(&response.status) {
                    let backoff = response
                        .header("retry-after")
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs);
                    return ResponseAction::Retry { backoff };
                }
                if response.status >= 400 {
                    return ResponseAction::Fail;
                }
                ResponseAction::Success
            }
            Err(error) => {
                if error.is_retryable() {
                    ResponseAction::Retry { backoff: None }
                } else {
                    ResponseAction::Fail
                }
            }
        }
    }
}

/// Computes the delay before a retry attempt
#[derive(Debug, Clone)]
pub struct BackoffStrategy {
    /// Type of backoff progression
    pub backoff_type: BackoffType,
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound on any single delay
    pub max: Duration,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(60),
        }
    }
}

impl BackoffStrategy {
    /// Create a backoff strategy
    pub fn new(backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        Self {
            backoff_type,
            initial,
            max,
        }
    }

    /// A constant backoff (handy in tests)
    pub fn constant(delay: Duration) -> Self {
        Self::new(BackoffType::Constant, delay, delay)
    }

    /// Delay for a given zero-based attempt number
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial,
            BackoffType::Linear => self.initial * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max)
    }
}

/// Handler that never retries: every non-success outcome is fatal
#[derive(Debug, Clone, Default)]
pub struct FailOnErrorHandler;

impl ErrorHandler for FailOnErrorHandler {
    fn classify(&self, outcome: &Result<DecodedResponse>) -> ResponseAction {
        match outcome {
            Ok(response) if response.is_success() => ResponseAction::Success,
            _ => ResponseAction::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_default_handler_success() {
        let handler = DefaultErrorHandler::new();
        let outcome = Ok(DecodedResponse::new(200, json!({})));
        assert_eq!(handler.classify(&outcome), ResponseAction::Success);
    }

    #[test]
    fn test_default_handler_retries_server_errors() {
        let handler = DefaultErrorHandler::new();
        for status in [429, 500, 502, 503, 504] {
            let outcome = Ok(DecodedResponse::new(status, json!({})));
            assert!(matches!(
                handler.classify(&outcome),
                ResponseAction::Retry { .. }
            ));
        }
    }

    #[test]
    fn test_default_handler_honors_retry_after() {
        let handler = DefaultErrorHandler::new();
        let mut response = DecodedResponse::new(429, json!({}));
        response
            .headers
            .insert("retry-after".to_string(), "7".to_string());

        match handler.classify(&Ok(response)) {
            ResponseAction::Retry { backoff } => {
                assert_eq!(backoff, Some(Duration::from_secs(7)));
            }
            other => panic!("expected Retry, got {other:?}"),
        }
    }

    #[test]
    fn test_default_handler_fails_client_errors() {
        let handler = DefaultErrorHandler::new();
        let outcome = Ok(DecodedResponse::new(404, json!({})));
        assert_eq!(handler.classify(&outcome), ResponseAction::Fail);
    }

    #[test]
    fn test_default_handler_ignore_statuses() {
        let handler = DefaultErrorHandler::new().ignoring(vec![403]);
        let outcome = Ok(DecodedResponse::new(403, json!({})));
        assert_eq!(handler.classify(&outcome), ResponseAction::Ignore);
    }

    #[test]
    fn test_default_handler_transport_errors() {
        let handler = DefaultErrorHandler::new();
        let outcome = Err(Error::Timeout { timeout_ms: 1000 });
        assert!(matches!(
            handler.classify(&outcome),
            ResponseAction::Retry { .. }
        ));

        let outcome = Err(Error::config("bad"));
        assert_eq!(handler.classify(&outcome), ResponseAction::Fail);
    }

    #[test]
    fn test_backoff_progressions() {
        let constant = BackoffStrategy::constant(Duration::from_millis(50));
        assert_eq!(constant.delay(0), Duration::from_millis(50));
        assert_eq!(constant.delay(5), Duration::from_millis(50));

        let linear = BackoffStrategy::new(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(60),
        );
        assert_eq!(linear.delay(0), Duration::from_millis(100));
        assert_eq!(linear.delay(2), Duration::from_millis(300));

        let exponential = BackoffStrategy::default();
        assert_eq!(exponential.delay(0), Duration::from_millis(100));
        assert_eq!(exponential.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let strategy = BackoffStrategy::new(
            BackoffType::Exponential,
            Duration::from_secs(1),
            Duration::from_secs(10),
        );
        assert_eq!(strategy.delay(10), Duration::from_secs(10));
    }
}
