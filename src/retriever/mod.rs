//! Retrievers: the per-slice read orchestrators
//!
//! # Overview
//!
//! A retriever turns one stream slice into a lazy sequence of records.
//! [`SimpleRetriever`] drives a request/paginate loop against synchronous
//! APIs; [`AsyncRetriever`] drives the submit/poll/download lifecycle of
//! server-side extraction jobs. Both notify their bound cursor as records
//! are pulled, so state reflects exactly what the consumer has seen.

mod async_job;
mod simple;
mod types;

pub use async_job::{AsyncJob, AsyncJobConfig, AsyncRetriever, JobStatus};
pub use simple::SimpleRetriever;
pub use types::{send_with_policy, Retriever, RetrieverConfig};
