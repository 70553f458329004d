//! Dispatcher - fan-out to the console worker and the file worker pool
//!
//! The dispatcher owns one long-lived OS thread per worker: a single
//! console worker plus a fixed pool of file workers. Each worker has its
//! own FIFO queue; `submit` hands one shared bulk to every queue.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bulk_protocol::Bulk;
use crossbeam::channel::{unbounded, Sender};
use parking_lot::RwLock;

use bulk_sinks::{
    ConsoleSink, ConsoleSinkMetrics, FileSink, FileSinkConfig, FileSinkMetrics,
};

use crate::error::DispatcherError;
use crate::DEFAULT_FILE_WORKERS;

/// Sleep between emptiness checks while quiescing
const QUIESCE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of file workers (and thus copies of every bulk on disk)
    pub file_workers: usize,

    /// Directory the file sinks write into
    pub output_dir: PathBuf,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            file_workers: DEFAULT_FILE_WORKERS,
            output_dir: PathBuf::from("."),
        }
    }
}

impl DispatcherConfig {
    /// Create config with a custom file worker count
    #[must_use]
    pub fn with_file_workers(mut self, count: usize) -> Self {
        self.file_workers = count;
        self
    }

    /// Create config with a custom output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// One running worker: its queue's sender side and its thread
struct WorkerHandle {
    /// Worker name for logging (doubles as the thread name)
    name: String,

    /// Sender half of the worker's queue
    sender: Sender<Arc<Bulk>>,

    /// The worker's OS thread
    thread: thread::JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker thread running the given drain loop
    fn spawn(
        name: String,
        sender: Sender<Arc<Bulk>>,
        run: impl FnOnce() + Send + 'static,
    ) -> Result<Self, DispatcherError> {
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(run)
            .map_err(|source| DispatcherError::WorkerSpawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            sender,
            thread,
        })
    }

    /// Enqueue a bulk onto this worker's queue
    ///
    /// The send doubles as the wake-up signal: the worker blocks on its
    /// empty queue and resumes on arrival.
    fn enqueue(&self, bulk: Arc<Bulk>) {
        if self.sender.send(bulk).is_err() {
            tracing::error!(worker = %self.name, "worker queue closed unexpectedly, dropping bulk");
        }
    }

    /// Number of bulks currently queued for this worker
    fn queue_len(&self) -> usize {
        self.sender.len()
    }

    /// Close the queue and wait for the worker to drain it and exit
    fn join(self) {
        drop(self.sender);
        if self.thread.join().is_err() {
            tracing::error!(worker = %self.name, "worker thread panicked");
        }
    }
}

/// Running worker set; taken out as a whole on stop
struct WorkerSet {
    console: WorkerHandle,
    files: Vec<WorkerHandle>,
}

impl WorkerSet {
    fn all_queues_empty(&self) -> bool {
        self.console.queue_len() == 0 && self.files.iter().all(|w| w.queue_len() == 0)
    }
}

/// Fan-out engine owning the console worker and the file worker pool
///
/// # Example
///
/// ```no_run
/// use bulk_pipeline::{Dispatcher, DispatcherConfig};
/// use bulk_protocol::{Assembler, ContextId};
///
/// let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
///
/// let mut assembler = Assembler::new(ContextId::from_index(0), 3);
/// for bulk in assembler.ingest(b"one\ntwo\nthree\n") {
///     dispatcher.submit(bulk);
/// }
///
/// dispatcher.shutdown();
/// ```
pub struct Dispatcher {
    /// Live workers; `None` once stopped
    workers: RwLock<Option<WorkerSet>>,

    /// Console sink metrics, valid across the sink's whole life
    console_metrics: Arc<ConsoleSinkMetrics>,

    /// File sink metrics, indexed by worker (0-based)
    file_metrics: Vec<Arc<FileSinkMetrics>>,
}

impl Dispatcher {
    /// Start a dispatcher with the console worker writing to stdout
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatcherError> {
        Self::with_console_writer(config, Box::new(std::io::stdout()))
    }

    /// Start a dispatcher with the console worker writing to a custom stream
    pub fn with_console_writer(
        config: DispatcherConfig,
        writer: Box<dyn Write + Send>,
    ) -> Result<Self, DispatcherError> {
        if config.file_workers == 0 {
            return Err(DispatcherError::EmptyPool);
        }

        let (console_tx, console_rx) = unbounded();
        let console_sink = ConsoleSink::with_writer(console_rx, writer);
        let console_metrics = console_sink.metrics();
        let console = WorkerHandle::spawn("bulk-console".to_string(), console_tx, move || {
            console_sink.run();
        })?;

        let mut files = Vec::with_capacity(config.file_workers);
        let mut file_metrics = Vec::with_capacity(config.file_workers);
        for index in 1..=config.file_workers {
            let (tx, rx) = unbounded();
            let sink_config = FileSinkConfig::default().with_output_dir(config.output_dir.clone());
            let sink = FileSink::new(rx, index, sink_config);
            file_metrics.push(sink.metrics());
            let handle = WorkerHandle::spawn(format!("bulk-file-{index}"), tx, move || {
                sink.run();
            });
            match handle {
                Ok(handle) => files.push(handle),
                Err(e) => {
                    // Unwind the workers spawned so far before reporting.
                    console.join();
                    for worker in files {
                        worker.join();
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            file_workers = config.file_workers,
            output_dir = %config.output_dir.display(),
            "dispatcher started"
        );

        Ok(Self {
            workers: RwLock::new(Some(WorkerSet { console, files })),
            console_metrics,
            file_metrics,
        })
    }

    /// Fan a completed bulk out to every worker
    ///
    /// The bulk is wrapped in `Arc` once and enqueued onto the console
    /// queue and then onto every file queue. The running check and the
    /// enqueues happen under one read lock, so a concurrent `stop` can
    /// never observe a half-delivered bulk.
    ///
    /// Submitting after `stop` is a caller bug; the bulk is dropped with
    /// a warning.
    pub fn submit(&self, bulk: Bulk) {
        let guard = self.workers.read();
        let Some(workers) = guard.as_ref() else {
            tracing::warn!(
                context = %bulk.context_id(),
                sequence = bulk.sequence(),
                "submit after stop, dropping bulk"
            );
            return;
        };

        let bulk = Arc::new(bulk);
        workers.console.enqueue(Arc::clone(&bulk));
        for worker in &workers.files {
            worker.enqueue(Arc::clone(&bulk));
        }
    }

    /// Block until every worker queue is momentarily empty
    ///
    /// Polls with a short sleep rather than locking producers out; it does
    /// not prevent further submissions, so emptiness is a snapshot, not a
    /// barrier. Returns immediately if the dispatcher is stopped.
    pub fn quiesce(&self) {
        loop {
            {
                let guard = self.workers.read();
                let Some(workers) = guard.as_ref() else { return };
                if workers.all_queues_empty() {
                    return;
                }
            }
            thread::sleep(QUIESCE_POLL_INTERVAL);
        }
    }

    /// Stop all workers, draining their queues first
    ///
    /// Dropping the sender sides closes the queues; every worker finishes
    /// whatever is still queued, exits, and is joined. Idempotent.
    pub fn stop(&self) {
        let Some(workers) = self.workers.write().take() else {
            tracing::debug!("dispatcher already stopped");
            return;
        };

        workers.console.join();
        for worker in workers.files {
            worker.join();
        }

        let console = self.console_metrics.snapshot();
        let files: u64 = self
            .file_metrics
            .iter()
            .map(|m| m.snapshot().files_created)
            .sum();
        tracing::info!(
            console_bulks = console.bulks_received,
            files_created = files,
            "dispatcher stopped"
        );
    }

    /// Quiesce, then stop
    pub fn shutdown(&self) {
        self.quiesce();
        self.stop();
    }

    /// Check whether the workers are still accepting bulks
    pub fn is_running(&self) -> bool {
        self.workers.read().is_some()
    }

    /// Number of file workers this dispatcher was started with
    pub fn file_worker_count(&self) -> usize {
        self.file_metrics.len()
    }

    /// Console sink metrics
    pub fn console_metrics(&self) -> &Arc<ConsoleSinkMetrics> {
        &self.console_metrics
    }

    /// File sink metrics, one entry per worker
    pub fn file_metrics(&self) -> &[Arc<FileSinkMetrics>] {
        &self.file_metrics
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
