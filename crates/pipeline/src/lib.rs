//! Bulk Collector - Pipeline
//!
//! The dispatcher that fans completed bulks out to every output worker.
//!
//! # Architecture
//!
//! ```text
//! [Contexts]                [Dispatcher]                  [Workers]
//!    ctx 0 ──┐                                     ┌──→ queue ──→ console thread
//!    ctx 1 ──┼──→ submit(Bulk) ──→ Arc<Bulk> ──────┼──→ queue ──→ file thread 1
//!    ctx 2 ──┘                                     └──→ queue ──→ file thread 2
//! ```
//!
//! # Key Design
//!
//! - **One queue per worker**: every worker owns its receiver and drains it
//!   on its own OS thread; queues never share locks
//! - **Arc fan-out**: one allocation per submitted bulk, shared by reference
//!   with every worker
//! - **All-or-nothing**: a submit enqueues to every worker under one running
//!   check, so a bulk is never half-delivered
//! - **Drain on stop**: stopping drops the sender sides; each worker drains
//!   its queue to completion before its thread exits and is joined
//! - **FIFO per worker**: consumption order equals enqueue order within one
//!   queue; nothing is promised across workers

mod dispatcher;
mod error;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::DispatcherError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, DispatcherError>;

/// Reference size of the file worker pool
pub const DEFAULT_FILE_WORKERS: usize = 2;

#[cfg(test)]
mod dispatcher_test;
