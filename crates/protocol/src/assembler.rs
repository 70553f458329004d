//! Assembler - streaming bulk-assembly state machine
//!
//! The assembler turns a raw byte stream into completed bulks. It is the
//! stateful heart of a producer context: it carries partial lines across
//! calls, recognizes `{` / `}` block markers, and decides where command
//! groups end.
//!
//! # States
//!
//! - **Static** (depth 0): commands accumulate until the configured static
//!   size is reached, then emit. A static size of 0 disables size-based
//!   emission entirely.
//! - **Dynamic** (depth >= 1): a stand-alone `{` token suspends the static
//!   size and opens an explicitly-delimited block. Only the matching outer
//!   `}` emits; nested `{` / `}` pairs adjust depth without emitting.
//!
//! # Chunking
//!
//! `ingest` accepts bytes split at any boundary, including mid-command and
//! mid-marker. Identical byte streams produce identical bulk sequences
//! regardless of how the bytes were chunked across calls.

use bytes::BytesMut;

use crate::bulk::{Bulk, BulkBuilder};
use crate::context_id::ContextId;

/// Token that opens a dynamic block
const BLOCK_OPEN: &str = "{";

/// Token that closes a dynamic block
const BLOCK_CLOSE: &str = "}";

/// Streaming parser that folds newline-delimited commands into bulks
///
/// One assembler belongs to exactly one producer and is mutated only by
/// that producer's calls; it performs no locking of its own.
#[derive(Debug)]
pub struct Assembler {
    /// Identity stamped onto every emitted bulk
    context_id: ContextId,

    /// Current size cutoff; 0 while inside a dynamic block or when the
    /// context was created with no static cutoff
    static_size: usize,

    /// Commands accepted but not yet emitted
    pending: BulkBuilder,

    /// Static sizes suspended by open dynamic blocks, one per open block.
    /// Depth and the in-dynamic predicate are derived from this stack.
    suspended_sizes: Vec<usize>,

    /// Carry-over bytes not yet terminated by a newline
    buffer: BytesMut,

    /// Sequence number the next emitted bulk will receive
    next_sequence: u64,
}

impl Assembler {
    /// Create an assembler for one producer context
    ///
    /// `static_size` of 0 means no size-based emission: only dynamic
    /// blocks and the final flush produce bulks.
    pub fn new(context_id: ContextId, static_size: usize) -> Self {
        Self {
            context_id,
            static_size,
            pending: BulkBuilder::new(),
            suspended_sizes: Vec::new(),
            buffer: BytesMut::new(),
            next_sequence: 0,
        }
    }

    /// Get the id of this context
    #[inline]
    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    /// Check whether a dynamic block is currently open
    #[inline]
    pub fn in_dynamic(&self) -> bool {
        !self.suspended_sizes.is_empty()
    }

    /// Get the current dynamic block nesting depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.suspended_sizes.len()
    }

    /// Get the sequence number the next emitted bulk will carry
    #[inline]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Feed bytes into the assembler, returning any bulks they complete
    ///
    /// Every newline-terminated prefix becomes one token; trailing bytes
    /// without a newline are carried over to the next call. Emitted bulks
    /// are returned in completion order.
    pub fn ingest(&mut self, data: &[u8]) -> Vec<Bulk> {
        let mut emitted = Vec::new();
        if data.is_empty() {
            return emitted;
        }

        self.buffer.extend_from_slice(data);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            self.process_token(&line[..pos], &mut emitted);
        }

        emitted
    }

    /// Drain the carry-over buffer and emit any remaining pending commands
    ///
    /// The unterminated tail (if any) is processed as one final token.
    /// Pending commands are emitted only in the static state: a dynamic
    /// block that was never closed is discarded, because such a block is
    /// defined only by its closing `}`.
    pub fn flush(&mut self) -> Vec<Bulk> {
        let mut emitted = Vec::new();

        if !self.buffer.is_empty() {
            let tail = self.buffer.split();
            self.process_token(&tail, &mut emitted);
        }

        if !self.in_dynamic() {
            self.emit_pending(&mut emitted);
        }

        emitted
    }

    /// Handle one raw token (newline already stripped)
    fn process_token(&mut self, raw: &[u8], emitted: &mut Vec<Bulk>) {
        let token = String::from_utf8_lossy(raw);
        let token = token.trim();
        if token.is_empty() {
            return;
        }

        match token {
            BLOCK_OPEN => {
                // Entering the outermost dynamic block cuts the current
                // static group short; nested opens only deepen.
                if !self.in_dynamic() {
                    self.emit_pending(emitted);
                }
                self.suspended_sizes.push(self.static_size);
                self.static_size = 0;
            }
            BLOCK_CLOSE => {
                // A close with no matching open is ignored.
                if let Some(size) = self.suspended_sizes.pop() {
                    if self.suspended_sizes.is_empty() {
                        self.emit_pending(emitted);
                    }
                    self.static_size = size;
                }
            }
            command => {
                self.pending.push(command.to_string());
                if self.static_size > 0 && self.pending.count() >= self.static_size {
                    self.emit_pending(emitted);
                }
            }
        }
    }

    /// Turn the pending group into a bulk, if it is non-empty
    ///
    /// The sequence counter advances only when a bulk is actually emitted,
    /// keeping sequences gap-free.
    fn emit_pending(&mut self, emitted: &mut Vec<Bulk>) {
        if let Some(bulk) = self.pending.finish(&self.context_id, self.next_sequence) {
            self.next_sequence += 1;
            emitted.push(bulk);
        }
    }
}
