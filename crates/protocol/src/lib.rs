//! Bulk Protocol - Core types for the bulk collector
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `Bulk` - An immutable completed command group
//! - `ContextId` - Identity of the producer context that emitted a bulk
//! - `BulkBuilder` - Accumulator for commands not yet emitted
//! - `Assembler` - Streaming parser that folds a byte stream into bulks
//!
//! # Design Principles
//!
//! - **Pure**: no I/O, no threads, no global state. The assembler is a
//!   deterministic state machine that can be unit tested exhaustively.
//! - **Arc-friendly**: a finished `Bulk` is immutable and can be wrapped in
//!   `Arc` for multi-sink fan-out.
//! - **Chunking-invariant**: feeding the same bytes in one call or split at
//!   arbitrary byte boundaries yields the same sequence of bulks.

mod assembler;
mod bulk;
mod context_id;

pub use assembler::Assembler;
pub use bulk::{Bulk, BulkBuilder};
pub use context_id::ContextId;

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};
