//! Pagination types
//!
//! Defines the page token, the closed strategy set, and stop conditions.

use super::strategies::{CursorPagination, OffsetIncrement, PageIncrement};
use crate::decode::extract_path;
use crate::error::Result;
use crate::http::DecodedResponse;
use crate::types::{JsonValue, Record};

/// An opaque value carried from one page's response to the next request:
/// a cursor id, a next URL, an offset, or a page number.
#[derive(Debug, Clone, PartialEq)]
pub struct PageToken(JsonValue);

impl PageToken {
    /// Wrap a raw JSON value
    pub fn new(value: JsonValue) -> Self {
        Self(value)
    }

    /// A string token
    pub fn string(value: impl Into<String>) -> Self {
        Self(JsonValue::String(value.into()))
    }

    /// A numeric token
    pub fn number(value: u64) -> Self {
        Self(JsonValue::Number(value.into()))
    }

    /// The underlying value
    pub fn value(&self) -> &JsonValue {
        &self.0
    }

    /// The token as a number, when it is one
    pub fn as_u64(&self) -> Option<u64> {
        self.0.as_u64()
    }

    /// Render the token for request injection: strings verbatim, anything
    /// else via its JSON rendering
    pub fn render(&self) -> String {
        match &self.0 {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Stop pagination when a response field equals a value
/// (e.g. `has_more == false`)
#[derive(Debug, Clone, PartialEq)]
pub struct StopCondition {
    /// Dotted path to the field
    pub path: String,
    /// Value that signals the last page
    pub value: JsonValue,
}

impl StopCondition {
    /// Create a stop condition
    pub fn new(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Check the condition against a response body
    pub fn is_met(&self, body: &JsonValue) -> bool {
        extract_path(body, &self.path) == Some(&self.value)
    }
}

/// The closed set of pagination strategies.
///
/// Picked once at construction; each case is a pure function of the
/// response, the page just read, and the token that fetched it.
#[derive(Debug, Clone)]
pub enum PaginationStrategy {
    /// Token read from the response (or the last record) of each page
    Cursor(CursorPagination),
    /// Running record offset advanced by each page's size
    Offset(OffsetIncrement),
    /// Incrementing page number
    Page(PageIncrement),
    /// Single page, never a next token
    Stop,
}

impl PaginationStrategy {
    /// Token for the very first request of a slice, if the strategy
    /// injects one (offset and page strategies do; cursor does not)
    pub fn initial_token(&self) -> Option<PageToken> {
        match self {
            Self::Cursor(_) | Self::Stop => None,
            Self::Offset(_) => Some(PageToken::number(0)),
            Self::Page(s) => Some(PageToken::number(s.start_from_page)),
        }
    }

    /// Configured page size, for request injection
    pub fn page_size(&self) -> Option<usize> {
        match self {
            Self::Cursor(s) => s.page_size,
            Self::Offset(s) => Some(s.page_size),
            Self::Page(s) => s.page_size,
            Self::Stop => None,
        }
    }

    /// Compute the token for the next page, or `None` when pagination is
    /// exhausted.
    ///
    /// A page with zero records terminates pagination even when a token is
    /// present, guarding against APIs that keep handing out tokens on
    /// empty result sets. Strategies that tolerate empty intermediate
    /// pages opt out via their `stop_on_empty_page` flag.
    pub fn next_page_token(
        &self,
        response: &DecodedResponse,
        last_page_size: usize,
        last_record: Option<&Record>,
        current: Option<&PageToken>,
    ) -> Result<Option<PageToken>> {
        if last_page_size == 0 && self.stop_on_empty_page() {
            return Ok(None);
        }

        match self {
            Self::Cursor(s) => s.next_page_token(response, last_record),
            Self::Offset(s) => Ok(s.next_page_token(last_page_size, current)),
            Self::Page(s) => Ok(s.next_page_token(last_page_size, current)),
            Self::Stop => Ok(None),
        }
    }

    fn stop_on_empty_page(&self) -> bool {
        match self {
            Self::Cursor(s) => s.stop_on_empty_page,
            Self::Offset(_) | Self::Page(_) | Self::Stop => true,
        }
    }
}
