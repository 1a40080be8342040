//! Pagination module
//!
//! Supports: cursor-by-response-field, offset increment, page increment,
//! single page
//!
//! # Overview
//!
//! A [`PaginationStrategy`] decides, from one page's response, whether
//! another page exists and what token identifies it. Strategies are a
//! closed set resolved at construction; they hold no hidden state. The
//! running token is threaded through explicitly by the [`Paginator`],
//! which also decides where the token lands on the next request and is
//! reset between slices.

mod paginator;
mod strategies;
mod types;

pub use paginator::Paginator;
pub use strategies::{CursorPagination, CursorSource, OffsetIncrement, PageIncrement};
pub use types::{PageToken, PaginationStrategy, StopCondition};
