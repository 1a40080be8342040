//! HTTP boundary: request sending, rate limiting, error classification
//!
//! # Overview
//!
//! The [`Requester`] trait is the seam between the retriever and the
//! network: one call, one request, one decoded response. The bundled
//! [`HttpRequester`] implements it on reqwest with token-bucket rate
//! limiting. Retrying is *not* done here: the retriever drives its retry
//! loop from the [`ErrorHandler`] classification, so the classification is
//! the single authority on what happens after a failed send.

mod client;
mod error_handler;
mod rate_limit;
mod types;

pub use client::{HttpRequester, HttpRequesterConfig};
pub use error_handler::{
    BackoffStrategy, DefaultErrorHandler, ErrorHandler, FailOnErrorHandler, ResponseAction,
};
pub use rate_limit::{RateLimit, RateLimitConfig};
pub use types::{DecodedResponse, HttpMethod, Requester, RequestSpec};
