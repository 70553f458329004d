//! Context - one producer's parsing state plus its dispatcher handle

use std::sync::Arc;

use bulk_pipeline::Dispatcher;
use bulk_protocol::{Assembler, ContextId};

/// One producer's stateful parser and its route into the pipeline
///
/// The assembler does the parsing; the context forwards every bulk it
/// completes straight into the dispatcher. Bulks are self-contained, so
/// nothing in the pipeline refers back to the context once a bulk has
/// been submitted.
pub(crate) struct Context {
    /// Bulk-assembly state machine
    assembler: Assembler,

    /// Shared dispatcher; kept alive at least as long as this context
    dispatcher: Arc<Dispatcher>,
}

impl Context {
    pub(crate) fn new(id: ContextId, static_size: usize, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            assembler: Assembler::new(id, static_size),
            dispatcher,
        }
    }

    pub(crate) fn context_id(&self) -> &ContextId {
        self.assembler.context_id()
    }

    /// Feed bytes through the assembler, submitting every completed bulk
    pub(crate) fn ingest(&mut self, data: &[u8]) {
        for bulk in self.assembler.ingest(data) {
            self.dispatcher.submit(bulk);
        }
    }

    /// Final flush on destruction: drain the byte buffer and emit any
    /// remaining static-state pending commands
    pub(crate) fn finish(mut self) {
        for bulk in self.assembler.flush() {
            self.dispatcher.submit(bulk);
        }
    }
}
