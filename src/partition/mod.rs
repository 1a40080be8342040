//! Partition routing
//!
//! # Overview
//!
//! A partition router enumerates the parent entities (accounts, projects,
//! parent records) that a substream fans out over. Cursors compose a
//! router with per-partition or shared windowing to produce stream
//! slices.

mod routers;
mod types;

pub use routers::{ListRouter, ParentRouter};
pub use types::{Partition, PartitionRouter};

#[cfg(test)]
mod tests;
