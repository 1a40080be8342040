//! Paginator: strategy plus request decoration
//!
//! Owns one slice's pagination loop state (the current token) and knows
//! which request component the token and page size land in.

use super::types::{PageToken, PaginationStrategy};
use crate::error::Result;
use crate::http::DecodedResponse;
use crate::types::{JsonObject, JsonValue, Record, RequestOption, RequestOptionType, StringMap};

/// Drives a pagination strategy and decorates outgoing requests.
///
/// A paginator may be reused across slices, but only through [`reset`]
/// between uses: the current token never leaks from one slice into the
/// next.
///
/// [`reset`]: Paginator::reset
#[derive(Debug, Clone)]
pub struct Paginator {
    strategy: PaginationStrategy,
    page_token_option: RequestOption,
    page_size_option: Option<RequestOption>,
    token: Option<PageToken>,
    exhausted: bool,
}

impl Paginator {
    /// Create a paginator injecting the token per the given option
    pub fn new(strategy: PaginationStrategy, page_token_option: RequestOption) -> Self {
        let token = strategy.initial_token();
        Self {
            strategy,
            page_token_option,
            page_size_option: None,
            token,
            exhausted: false,
        }
    }

    /// Also inject the configured page size per the given option
    #[must_use]
    pub fn with_page_size_option(mut self, option: RequestOption) -> Self {
        self.page_size_option = Some(option);
        self
    }

    /// Current token, when one is held
    pub fn current_token(&self) -> Option<&PageToken> {
        self.token.as_ref()
    }

    /// Evaluate the strategy against the page just read and remember the
    /// resulting token. Returns `None` once pagination is exhausted.
    ///
    /// Strategy errors (e.g. a malformed token field) are not caught here;
    /// the retriever treats them as fatal for the slice.
    pub fn next_page_token(
        &mut self,
        response: &DecodedResponse,
        last_page_size: usize,
        last_record: Option<&Record>,
    ) -> Result<Option<PageToken>> {
        let next = self.strategy.next_page_token(
            response,
            last_page_size,
            last_record,
            self.token.as_ref(),
        )?;

        self.exhausted = next.is_none();
        self.token = next.clone();
        Ok(next)
    }

    /// Whether the strategy has signalled the final page
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Start a fresh pagination sequence (called by the retriever at the
    /// top of every slice)
    pub fn reset(&mut self) {
        self.token = self.strategy.initial_token();
        self.exhausted = false;
    }

    /// Query parameter fragment for the next request
    pub fn request_params(&self) -> StringMap {
        let mut params = StringMap::new();
        self.inject(RequestOptionType::RequestParameter, |key, value| {
            params.insert(key, value);
        });
        params
    }

    /// Header fragment for the next request
    pub fn request_headers(&self) -> StringMap {
        let mut headers = StringMap::new();
        self.inject(RequestOptionType::Header, |key, value| {
            headers.insert(key, value);
        });
        headers
    }

    /// JSON body fragment for the next request
    pub fn request_body_json(&self) -> JsonObject {
        let mut body = JsonObject::new();
        self.inject(RequestOptionType::BodyJson, |key, value| {
            body.insert(key, JsonValue::String(value));
        });
        body
    }

    /// Replacement request path, when the token is a full next-page URL
    /// injected into the path
    pub fn path(&self) -> Option<String> {
        if self.page_token_option.inject_into == RequestOptionType::Path {
            return self.token.as_ref().map(PageToken::render);
        }
        None
    }

    fn inject(&self, target: RequestOptionType, mut put: impl FnMut(String, String)) {
        if self.page_token_option.inject_into == target {
            if let Some(token) = &self.token {
                put(self.page_token_option.field_name.clone(), token.render());
            }
        }
        if let Some(option) = &self.page_size_option {
            if option.inject_into == target {
                if let Some(size) = self.strategy.page_size() {
                    put(option.field_name.clone(), size.to_string());
                }
            }
        }
    }
}
