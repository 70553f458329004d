//! Context registry - handle allocation, lookup, and lifecycle
//!
//! The registry maps opaque handles to contexts under a readers-writer
//! lock: `receive` lookups on distinct handles proceed in parallel,
//! while `connect` / `disconnect` take the lock exclusively. It also owns
//! the lazily-created dispatcher shared by every context.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use bulk_pipeline::{Dispatcher, DispatcherConfig};
use bulk_protocol::ContextId;

use crate::context::Context;
use crate::handle::ContextHandle;

/// Process-wide registry of producer contexts
///
/// The free functions in the crate root delegate to a single static
/// instance; the type itself is kept constructible so the whole lifecycle
/// can be exercised in isolation.
pub struct Registry {
    /// Live contexts. Each context sits behind its own mutex so that
    /// concurrent `receive` calls on the same handle are serialized
    /// without holding the map lock for the duration of parsing.
    contexts: RwLock<HashMap<ContextHandle, Mutex<Context>>>,

    /// Handle mint; 0 is reserved for the null handle
    next_handle: AtomicU64,

    /// Context id mint, shared by all contexts of this registry
    next_context_id: AtomicU64,

    /// Lazily-created dispatcher, recreated if used again after shutdown
    dispatcher: Mutex<Option<Arc<Dispatcher>>>,

    /// Configuration the next dispatcher will be created with
    config: Mutex<DispatcherConfig>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the default dispatcher configuration
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            next_context_id: AtomicU64::new(0),
            dispatcher: Mutex::new(None),
            config: Mutex::new(DispatcherConfig::default()),
        }
    }

    /// Set the dispatcher configuration, unless the dispatcher already runs
    pub fn configure(&self, config: DispatcherConfig) -> bool {
        let slot = self.dispatcher.lock();
        if slot.as_ref().is_some_and(|d| d.is_running()) {
            tracing::warn!("dispatcher already running, keeping its configuration");
            return false;
        }
        *self.config.lock() = config;
        true
    }

    /// Get the shared dispatcher, creating it on first use
    fn dispatcher(&self) -> Result<Arc<Dispatcher>, bulk_pipeline::DispatcherError> {
        let mut slot = self.dispatcher.lock();
        if let Some(dispatcher) = slot.as_ref() {
            if dispatcher.is_running() {
                return Ok(Arc::clone(dispatcher));
            }
        }

        let dispatcher = Arc::new(Dispatcher::new(self.config.lock().clone())?);
        *slot = Some(Arc::clone(&dispatcher));
        Ok(dispatcher)
    }

    /// Allocate a context and return its handle
    ///
    /// Returns the null handle after logging if the dispatcher could not
    /// be started.
    pub fn connect(&self, static_size: usize) -> ContextHandle {
        let dispatcher = match self.dispatcher() {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                tracing::error!(error = %e, "failed to create context");
                return ContextHandle::NULL;
            }
        };

        let id = ContextId::from_index(self.next_context_id.fetch_add(1, Ordering::Relaxed));
        let handle = ContextHandle::from_raw(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let context = Context::new(id.clone(), static_size, dispatcher);

        self.contexts.write().insert(handle, Mutex::new(context));
        tracing::debug!(%handle, context = %id, static_size, "context connected");

        handle
    }

    /// Forward bytes to the context behind `handle`, if it exists
    pub fn receive(&self, handle: ContextHandle, data: &[u8]) {
        if handle.is_null() || data.is_empty() {
            return;
        }

        let contexts = self.contexts.read();
        if let Some(context) = contexts.get(&handle) {
            context.lock().ingest(data);
        }
    }

    /// Flush and destroy the context behind `handle`, if it exists
    pub fn disconnect(&self, handle: ContextHandle) {
        if handle.is_null() {
            return;
        }

        let removed = self.contexts.write().remove(&handle);
        if let Some(context) = removed {
            let context = context.into_inner();
            tracing::debug!(%handle, context = %context.context_id(), "context disconnected");
            context.finish();
        }
    }

    /// Block until the worker queues are momentarily empty
    pub fn quiesce(&self) {
        let dispatcher = self.dispatcher.lock().clone();
        if let Some(dispatcher) = dispatcher {
            dispatcher.quiesce();
        }
    }

    /// Flush and destroy every context, then shut the dispatcher down
    pub fn shutdown(&self) {
        let drained: Vec<(ContextHandle, Mutex<Context>)> =
            self.contexts.write().drain().collect();
        let remaining = drained.len();
        for (_, context) in drained {
            context.into_inner().finish();
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.shutdown();
        }

        if remaining > 0 {
            tracing::info!(contexts = remaining, "session shutdown flushed remaining contexts");
        }
    }

    /// Number of live contexts
    pub fn context_count(&self) -> usize {
        self.contexts.read().len()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
