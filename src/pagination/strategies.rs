//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{PageToken, StopCondition};
use crate::decode::extract_path;
use crate::error::{Error, Result};
use crate::http::DecodedResponse;
use crate::types::{JsonValue, Record};

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Where the cursor token is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorSource {
    /// A dotted path into the response body (e.g. `meta.next_cursor`)
    ResponseField(String),
    /// A dotted path into the last record of the page (e.g. `id`)
    LastRecordField(String),
}

/// Cursor-based pagination (e.g. Stripe, Slack)
///
/// Reads an opaque cursor from each page and hands it to the next request.
/// A missing, null, or empty cursor ends pagination.
#[derive(Debug, Clone)]
pub struct CursorPagination {
    /// Where to read the token
    pub source: CursorSource,
    /// Optional explicit last-page signal (e.g. `has_more == false`)
    pub stop_condition: Option<StopCondition>,
    /// Page size to inject, when the API takes one
    pub page_size: Option<usize>,
    /// Whether a zero-record page ends pagination (default true)
    pub stop_on_empty_page: bool,
}

impl CursorPagination {
    /// Token read from a response body field
    pub fn from_response(path: impl Into<String>) -> Self {
        Self {
            source: CursorSource::ResponseField(path.into()),
            stop_condition: None,
            page_size: None,
            stop_on_empty_page: true,
        }
    }

    /// Token read from a field of the page's last record
    pub fn from_last_record(path: impl Into<String>) -> Self {
        Self {
            source: CursorSource::LastRecordField(path.into()),
            stop_condition: None,
            page_size: None,
            stop_on_empty_page: true,
        }
    }

    /// Set an explicit stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Allow empty intermediate pages
    #[must_use]
    pub fn allow_empty_pages(mut self) -> Self {
        self.stop_on_empty_page = false;
        self
    }

    pub(super) fn next_page_token(
        &self,
        response: &DecodedResponse,
        last_record: Option<&Record>,
    ) -> Result<Option<PageToken>> {
        if let Some(condition) = &self.stop_condition {
            if condition.is_met(&response.body) {
                return Ok(None);
            }
        }

        let raw = match &self.source {
            CursorSource::ResponseField(path) => extract_path(&response.body, path),
            CursorSource::LastRecordField(path) => {
                last_record.and_then(|record| extract_path(record, path))
            }
        };

        match raw {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
            Some(value @ (JsonValue::String(_) | JsonValue::Number(_))) => {
                Ok(Some(PageToken::new(value.clone())))
            }
            Some(other) => Err(Error::pagination(format!(
                "cursor token must be a string or number, got: {other}"
            ))),
        }
    }
}

// ============================================================================
// Offset Increment
// ============================================================================

/// Offset-based pagination (e.g. SQL-style `?offset=100&limit=50`)
///
/// The token is the running record offset; it advances by each page's size
/// and stops on the first short page.
#[derive(Debug, Clone)]
pub struct OffsetIncrement {
    /// Number of records requested per page
    pub page_size: usize,
}

impl OffsetIncrement {
    /// Create an offset strategy
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    pub(super) fn next_page_token(
        &self,
        last_page_size: usize,
        current: Option<&PageToken>,
    ) -> Option<PageToken> {
        if last_page_size < self.page_size {
            return None;
        }

        let offset = current.and_then(PageToken::as_u64).unwrap_or(0);
        Some(PageToken::number(offset + last_page_size as u64))
    }
}

// ============================================================================
// Page Increment
// ============================================================================

/// Page number pagination (e.g. `?page=2&per_page=50`)
#[derive(Debug, Clone)]
pub struct PageIncrement {
    /// First page number (0 or 1 depending on the API)
    pub start_from_page: u64,
    /// Number of records per page, when the API takes one; also enables
    /// the short-page stop
    pub page_size: Option<usize>,
}

impl PageIncrement {
    /// Create a page-number strategy
    pub fn new(start_from_page: u64) -> Self {
        Self {
            start_from_page,
            page_size: None,
        }
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub(super) fn next_page_token(
        &self,
        last_page_size: usize,
        current: Option<&PageToken>,
    ) -> Option<PageToken> {
        if let Some(size) = self.page_size {
            if last_page_size < size {
                return None;
            }
        }

        let page = current
            .and_then(PageToken::as_u64)
            .unwrap_or(self.start_from_page);
        Some(PageToken::number(page + 1))
    }
}
