//! Common types and utilities for sinks
//!
//! Shared functionality across all sink types.

use bulk_protocol::Bulk;
use thiserror::Error;

/// Errors raised by sink write paths
///
/// These never cross the worker boundary: the worker logs them, bumps an
/// error counter, and moves on to the next bulk.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination could not be created
    #[error("failed to create '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Write to an already-open destination failed
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Render the canonical output line for a bulk (no terminator)
///
/// The same line goes to the console stream and into every sink file:
///
/// ```text
/// bulk: c1, c2, ..., cN
/// ```
pub fn render_line(bulk: &Bulk) -> String {
    let mut line = String::from("bulk: ");
    for (i, command) in bulk.commands().iter().enumerate() {
        if i > 0 {
            line.push_str(", ");
        }
        line.push_str(command);
    }
    line
}
