//! Bulk Collector - Session API
//!
//! The embeddable surface of the bulk collector. A producer obtains an
//! opaque handle with [`connect`], streams newline-delimited command bytes
//! through [`receive`], and releases the handle with [`disconnect`]. Each
//! handle owns an independent parsing context; completed bulks flow into
//! the process-wide dispatcher and from there to the console and file
//! workers.
//!
//! # Example
//!
//! ```no_run
//! let handle = bulk_session::connect(3);
//! bulk_session::receive(handle, b"cmd1\ncmd2\ncm");
//! bulk_session::receive(handle, b"d3\n");
//! bulk_session::disconnect(handle);
//!
//! // Before process exit: flush everything and join the workers.
//! bulk_session::shutdown();
//! ```
//!
//! # Guarantees
//!
//! - Calls with an unknown, already-disconnected, or null handle are
//!   silent no-ops; `disconnect` is idempotent
//! - `receive` never blocks on sink I/O and surfaces no errors
//! - Contexts on distinct handles may be driven from distinct threads
//!   concurrently; calls on the *same* handle are serialized internally
//!   but their relative order is the producer's responsibility
//!
//! # Shutdown
//!
//! Rust has no reliable process-exit hook for libraries, so deterministic
//! teardown is explicit: the embedding program calls [`shutdown`] before
//! exiting, which flushes and destroys every remaining context, drains the
//! worker queues, and joins the worker threads.

mod context;
mod handle;
mod registry;

pub use handle::ContextHandle;
pub use registry::Registry;

// The dispatcher configuration doubles as the session configuration.
pub use bulk_pipeline::{DispatcherConfig, DEFAULT_FILE_WORKERS};

use once_cell::sync::Lazy;

/// Process-wide registry behind the free-function API
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Configure the dispatcher before it starts
///
/// Applies only if the dispatcher has not been created yet (it is created
/// lazily by the first [`connect`]). Returns `false` and keeps the running
/// configuration otherwise.
pub fn init(config: DispatcherConfig) -> bool {
    REGISTRY.configure(config)
}

/// Allocate a new context with the given static block size
///
/// A `static_size` of 0 disables size-based emission: only `{` … `}`
/// blocks and the final flush produce bulks. On failure the error is
/// logged and the null handle is returned.
pub fn connect(static_size: usize) -> ContextHandle {
    REGISTRY.connect(static_size)
}

/// Feed bytes into the context behind `handle`
///
/// Bytes may be split at arbitrary boundaries across calls. Unknown
/// handles and empty slices are no-ops.
pub fn receive(handle: ContextHandle, data: &[u8]) {
    REGISTRY.receive(handle, data)
}

/// Flush and destroy the context behind `handle`
///
/// Pending commands are emitted unless the context is inside an unclosed
/// dynamic block, which is discarded. Unknown handles are no-ops and
/// repeated disconnects are harmless.
pub fn disconnect(handle: ContextHandle) {
    REGISTRY.disconnect(handle)
}

/// Block until every worker queue is momentarily empty
pub fn quiesce() {
    REGISTRY.quiesce()
}

/// Tear the library down: flush and destroy all contexts, then drain,
/// stop, and join the dispatcher workers
///
/// Call this once before process exit. A later `connect` starts a fresh
/// dispatcher.
pub fn shutdown() {
    REGISTRY.shutdown()
}
