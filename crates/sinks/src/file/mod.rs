//! File Sink - one uniquely-named file per bulk
//!
//! Each file worker owns one `FileSink` instance with a distinct worker
//! index. Per bulk, the sink creates a fresh `.log` file whose name
//! combines the bulk's first-command timestamp, context id and sequence
//! with the worker index and a worker-local file counter:
//!
//! ```text
//! bulk<SEC>_<USEC6>_<CTXID>_<SEQ>_<WIDX>_<FILECTR6>.log
//! ```
//!
//! `context id + sequence` are unique per bulk and `worker index + local
//! counter` are unique per delivery, so names never collide even when
//! timestamps do.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bulk_protocol::Bulk;
use crossbeam::channel::Receiver;

use crate::common::{render_line, SinkError};

/// Configuration for the file sink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Directory the per-bulk files are created in
    pub output_dir: PathBuf,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl FileSinkConfig {
    /// Create config with a custom output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// Metrics for a file sink
#[derive(Debug, Default)]
pub struct FileSinkMetrics {
    /// Total bulks received from the queue
    pub bulks_received: AtomicU64,

    /// Files successfully created and written
    pub files_created: AtomicU64,

    /// Create/write failures (logged, bulk dropped for this sink only)
    pub write_errors: AtomicU64,
}

impl FileSinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            bulks_received: AtomicU64::new(0),
            files_created: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    /// Record a received bulk
    #[inline]
    pub fn record_received(&self) {
        self.bulks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a written file
    #[inline]
    pub fn record_written(&self) {
        self.files_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failure
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bulks_received: self.bulks_received.load(Ordering::Relaxed),
            files_created: self.files_created.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of file sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bulks_received: u64,
    pub files_created: u64,
    pub write_errors: u64,
}

/// File sink owned by one file worker
pub struct FileSink {
    /// Queue receiver for bulks
    receiver: Receiver<Arc<Bulk>>,

    /// Output directory
    config: FileSinkConfig,

    /// 1-based index of the owning worker; part of every filename
    worker_index: usize,

    /// Worker-local file counter; advanced once per delivered bulk.
    /// Owned by this worker only, so a plain integer suffices.
    file_counter: u64,

    /// Sink name for logging
    name: String,

    /// Metrics (Arc for sharing with the dispatcher)
    metrics: Arc<FileSinkMetrics>,
}

impl FileSink {
    /// Create a file sink for the worker with the given 1-based index
    pub fn new(receiver: Receiver<Arc<Bulk>>, worker_index: usize, config: FileSinkConfig) -> Self {
        Self {
            receiver,
            config,
            worker_index,
            file_counter: 0,
            name: format!("file-{worker_index}"),
            metrics: Arc::new(FileSinkMetrics::new()),
        }
    }

    /// Get a shared handle to this sink's metrics
    pub fn metrics(&self) -> Arc<FileSinkMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Get the sink name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the 1-based worker index
    #[inline]
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Drain the queue until every sender is gone, then return final metrics
    pub fn run(mut self) -> MetricsSnapshot {
        tracing::debug!(sink = %self.name, dir = %self.config.output_dir.display(), "file sink starting");

        while let Ok(bulk) = self.receiver.recv() {
            self.emit(&bulk);
        }

        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            sink = %self.name,
            bulks = snapshot.bulks_received,
            files = snapshot.files_created,
            errors = snapshot.write_errors,
            "file sink shutting down"
        );

        snapshot
    }

    /// Persist one bulk into a freshly created file
    fn emit(&mut self, bulk: &Bulk) {
        if bulk.commands().is_empty() {
            return;
        }
        self.metrics.record_received();

        self.file_counter += 1;
        let path = self.config.output_dir.join(self.filename(bulk, self.file_counter));

        match write_bulk(&path, bulk) {
            Ok(()) => self.metrics.record_written(),
            Err(e) => {
                self.metrics.record_error();
                tracing::error!(
                    sink = %self.name,
                    context = %bulk.context_id(),
                    sequence = bulk.sequence(),
                    error = %e,
                    "file write failed, dropping bulk for this sink"
                );
            }
        }
    }

    /// Build the unique filename for a delivery
    fn filename(&self, bulk: &Bulk, file_number: u64) -> String {
        let first_time = bulk.first_time();
        format!(
            "bulk{}_{:06}_{}_{}_{}_{:06}.log",
            first_time.timestamp(),
            first_time.timestamp_subsec_micros(),
            bulk.context_id(),
            bulk.sequence(),
            self.worker_index,
            file_number,
        )
    }
}

/// Create the file and write the bulk's line into it
fn write_bulk(path: &Path, bulk: &Bulk) -> Result<(), SinkError> {
    let mut file = File::create(path).map_err(|source| SinkError::Create {
        path: path.display().to_string(),
        source,
    })?;
    writeln!(file, "{}", render_line(bulk))?;
    Ok(())
}
