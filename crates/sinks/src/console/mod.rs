//! Console Sink - shared line-oriented output
//!
//! Writes one `bulk: c1, c2, …` line per bulk to a shared output stream
//! (stdout by default). The stream is written only from the single console
//! worker thread, so no external locking is needed.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bulk_protocol::Bulk;
use crossbeam::channel::Receiver;

use crate::common::render_line;

/// Metrics for the console sink
#[derive(Debug, Default)]
pub struct ConsoleSinkMetrics {
    /// Total bulks received from the queue
    pub bulks_received: AtomicU64,

    /// Total commands written out
    pub commands_written: AtomicU64,

    /// Write failures (logged and dropped)
    pub write_errors: AtomicU64,
}

impl ConsoleSinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            bulks_received: AtomicU64::new(0),
            commands_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record a processed bulk
    #[inline]
    pub fn record_bulk(&self, commands: u64) {
        self.bulks_received.fetch_add(1, Ordering::Relaxed);
        self.commands_written.fetch_add(commands, Ordering::Relaxed);
    }

    /// Record a write failure
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bulks_received: self.bulks_received.load(Ordering::Relaxed),
            commands_written: self.commands_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of console sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bulks_received: u64,
    pub commands_written: u64,
    pub write_errors: u64,
}

/// Console sink draining one worker queue onto a shared stream
pub struct ConsoleSink {
    /// Queue receiver for bulks
    receiver: Receiver<Arc<Bulk>>,

    /// Output stream; stdout unless overridden
    writer: Box<dyn Write + Send>,

    /// Sink name for logging
    name: String,

    /// Metrics (Arc for sharing with the dispatcher)
    metrics: Arc<ConsoleSinkMetrics>,
}

impl ConsoleSink {
    /// Create a console sink writing to stdout
    pub fn new(receiver: Receiver<Arc<Bulk>>) -> Self {
        Self::with_writer(receiver, Box::new(std::io::stdout()))
    }

    /// Create a console sink writing to an arbitrary stream
    pub fn with_writer(receiver: Receiver<Arc<Bulk>>, writer: Box<dyn Write + Send>) -> Self {
        Self {
            receiver,
            writer,
            name: "console".to_string(),
            metrics: Arc::new(ConsoleSinkMetrics::new()),
        }
    }

    /// Get a shared handle to this sink's metrics
    pub fn metrics(&self) -> Arc<ConsoleSinkMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get the sink name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drain the queue until every sender is gone, then return final metrics
    ///
    /// Bulks are consumed strictly in enqueue order. The loop exits only
    /// once the channel is disconnected and empty, so stopping the
    /// dispatcher never loses queued bulks.
    pub fn run(mut self) -> MetricsSnapshot {
        tracing::debug!(sink = %self.name, "console sink starting");

        while let Ok(bulk) = self.receiver.recv() {
            self.emit(&bulk);
        }

        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            sink = %self.name,
            bulks = snapshot.bulks_received,
            commands = snapshot.commands_written,
            errors = snapshot.write_errors,
            "console sink shutting down"
        );

        snapshot
    }

    /// Write one bulk as a single line
    fn emit(&mut self, bulk: &Bulk) {
        // Empty bulks cannot be produced upstream; skip just in case.
        if bulk.commands().is_empty() {
            return;
        }

        let line = render_line(bulk);
        let result = writeln!(self.writer, "{line}").and_then(|()| self.writer.flush());
        match result {
            Ok(()) => self.metrics.record_bulk(bulk.count() as u64),
            Err(e) => {
                self.metrics.record_error();
                tracing::error!(
                    sink = %self.name,
                    context = %bulk.context_id(),
                    sequence = bulk.sequence(),
                    error = %e,
                    "console write failed, dropping bulk"
                );
            }
        }
    }
}
