//! Synchronous request/paginate retriever

use super::types::{send_with_policy, Retriever, RetrieverConfig};
use crate::cursor::Cursor;
use crate::decode::RecordSelector;
use crate::error::Result;
use crate::http::{DefaultErrorHandler, ErrorHandler, Requester, RequestSpec};
use crate::pagination::Paginator;
use crate::types::{JsonObject, JsonValue, Record, StreamSlice};
use futures::stream::{self, BoxStream};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Retriever for synchronous request/response APIs.
///
/// Per slice it walks BUILD_REQUEST, SEND, SELECT_RECORDS and loops while
/// the paginator produces tokens. Each record pulled from the stream is
/// reported to the bound cursor before it is yielded; the slice is closed
/// against the cursor only when its record stream drains normally, so a
/// failed slice never advances state.
pub struct SimpleRetriever {
    stream_name: String,
    requester: Arc<dyn Requester>,
    base_request: RequestSpec,
    selector: Box<dyn RecordSelector>,
    paginator: Option<Paginator>,
    error_handler: Box<dyn ErrorHandler>,
    cursor: Option<Box<dyn Cursor>>,
    config: RetrieverConfig,
    records_read: usize,
}

impl SimpleRetriever {
    /// Create a retriever for a stream
    pub fn new(
        stream_name: impl Into<String>,
        requester: Arc<dyn Requester>,
        base_request: RequestSpec,
        selector: Box<dyn RecordSelector>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            requester,
            base_request,
            selector,
            paginator: None,
            error_handler: Box::new(DefaultErrorHandler::new()),
            cursor: None,
            config: RetrieverConfig::default(),
            records_read: 0,
        }
    }

    /// Attach a paginator (default is a single page per slice)
    #[must_use]
    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = Some(paginator);
        self
    }

    /// Replace the error handler
    #[must_use]
    pub fn with_error_handler(mut self, handler: Box<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Bind an incremental cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Box<dyn Cursor>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Set retriever configuration (read caps, retry budget)
    #[must_use]
    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    /// The stream this retriever reads
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn build_request(&self, slice: &StreamSlice) -> RequestSpec {
        let mut request = self.base_request.clone();

        if let Some(cursor) = &self.cursor {
            request.apply_params(cursor.request_params(slice));
            request.apply_headers(cursor.request_headers(slice));
            request.apply_body_json(cursor.request_body_json(slice));
        }
        if let Some(paginator) = &self.paginator {
            request.apply_params(paginator.request_params());
            request.apply_headers(paginator.request_headers());
            request.apply_body_json(paginator.request_body_json());
            if let Some(url) = paginator.path() {
                request.set_url(url);
            }
        }
        request
    }

    /// Fetch one page. `Ok(None)` means the error handler classified the
    /// outcome as ignorable: an empty page that ends the slice.
    async fn fetch_page(&mut self, slice: &StreamSlice) -> Result<Option<Vec<Record>>> {
        let request = self.build_request(slice);

        let Some(response) = send_with_policy(
            self.requester.as_ref(),
            self.error_handler.as_ref(),
            &self.config,
            &request,
        )
        .await?
        else {
            debug!(stream = %self.stream_name, "response ignored, treating as empty page");
            return Ok(None);
        };

        let records = self.selector.select(&response.body)?;
        if let Some(paginator) = self.paginator.as_mut() {
            paginator.next_page_token(&response, records.len(), records.last())?;
        }
        Ok(Some(records))
    }
}

struct ReadState<'a> {
    r: &'a mut SimpleRetriever,
    slice: StreamSlice,
    buffer: VecDeque<Record>,
    pages_fetched: usize,
    more_pages: bool,
    failed: bool,
    closed: bool,
}

impl Retriever for SimpleRetriever {
    fn stream_slices(&mut self) -> Result<Vec<StreamSlice>> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.stream_slices(),
            None => Ok(vec![StreamSlice::default()]),
        }
    }

    fn read_records<'a>(&'a mut self, slice: &StreamSlice) -> BoxStream<'a, Result<Record>> {
        if let Some(paginator) = self.paginator.as_mut() {
            paginator.reset();
        }

        let state = ReadState {
            r: self,
            slice: slice.clone(),
            buffer: VecDeque::new(),
            pages_fetched: 0,
            more_pages: true,
            failed: false,
            closed: false,
        };

        Box::pin(stream::unfold(state, |mut st| async move {
            loop {
                if st.r.config.max_records.is_some_and(|max| st.r.records_read >= max) {
                    st.buffer.clear();
                    st.more_pages = false;
                }

                if let Some(record) = st.buffer.pop_front() {
                    if let Some(cursor) = st.r.cursor.as_mut() {
                        cursor.observe(&st.slice, &record);
                    }
                    st.r.records_read += 1;
                    return Some((Ok(record), st));
                }

                if !st.more_pages {
                    // Slice drained normally: fold its progress into state.
                    // A failed slice is left open so state never reflects it.
                    if !st.failed && !st.closed {
                        st.closed = true;
                        if let Some(cursor) = st.r.cursor.as_mut() {
                            cursor.close_slice(&st.slice);
                        }
                    }
                    return None;
                }

                match st.r.fetch_page(&st.slice).await {
                    Ok(Some(records)) => {
                        st.pages_fetched += 1;
                        let exhausted =
                            st.r.paginator.as_ref().is_none_or(Paginator::is_exhausted);
                        let capped =
                            st.r.config.max_pages.is_some_and(|max| st.pages_fetched >= max);
                        st.more_pages = !exhausted && !capped;
                        st.buffer.extend(records);
                    }
                    Ok(None) => {
                        st.more_pages = false;
                    }
                    Err(e) => {
                        st.more_pages = false;
                        st.failed = true;
                        return Some((Err(e), st));
                    }
                }
            }
        }))
    }

    fn stream_state(&self) -> JsonValue {
        self.cursor
            .as_ref()
            .map_or_else(|| JsonValue::Object(JsonObject::new()), |c| c.stream_state())
    }

    fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }
}

impl std::fmt::Debug for SimpleRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleRetriever")
            .field("stream_name", &self.stream_name)
            .field("has_paginator", &self.paginator.is_some())
            .field("has_cursor", &self.cursor.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
