//! Bulk Collector - Sinks
//!
//! Output sinks for completed bulks. Each sink owns the receiving end of
//! one worker queue and drains it on a dedicated worker thread; the
//! dispatcher holds the sending ends and fans every bulk out to all of
//! them.
//!
//! ```text
//! [Dispatcher] --Arc<Bulk>--> [Worker Queue] --> [Worker Thread] --> [Destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `console` | One `bulk: …` line per bulk on a shared output stream |
//! | `file` | One uniquely-named `.log` file per bulk |
//!
//! A sink never propagates I/O failures: a failed write is logged,
//! counted, and the bulk is dropped for that sink only.

/// Console sink - shared line-oriented output
pub mod console;

/// File sink - one file per bulk, unique name per worker
pub mod file;

/// Common types shared by all sinks (errors, line rendering)
mod common;

pub use common::{render_line, SinkError};
pub use console::{ConsoleSink, ConsoleSinkMetrics};
pub use file::{FileSink, FileSinkConfig, FileSinkMetrics};
