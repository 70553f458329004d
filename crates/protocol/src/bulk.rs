//! Bulk - Completed command group
//!
//! The `Bulk` struct is the core value that flows through the pipeline.
//! It is immutable after construction and is shared by reference (`Arc`)
//! between every worker that consumes it.

use chrono::{DateTime, Utc};

use crate::context_id::ContextId;

/// An immutable completed group of commands
///
/// # Design
///
/// - `commands` is never empty: the builder refuses to finish an empty group
/// - `first_time` is the wall-clock instant the first command was accepted
/// - `sequence` is assigned by the emitting context, gap-free from 0
/// - A finished bulk carries everything a sink needs; it holds no reference
///   back to the context that produced it
#[derive(Debug, Clone)]
pub struct Bulk {
    /// Commands in arrival order
    commands: Vec<String>,

    /// Wall-clock time of the first command in the group
    first_time: DateTime<Utc>,

    /// Identity of the producing context
    context_id: ContextId,

    /// Per-context emission counter, starting at 0
    sequence: u64,
}

impl Bulk {
    /// Get the commands in arrival order
    #[inline]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Get the number of commands
    #[inline]
    pub fn count(&self) -> usize {
        self.commands.len()
    }

    /// Get the timestamp of the first command
    #[inline]
    pub fn first_time(&self) -> DateTime<Utc> {
        self.first_time
    }

    /// Get the id of the producing context
    #[inline]
    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    /// Get the per-context sequence number
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Accumulator for commands not yet emitted
///
/// Used by the assembler to collect commands until an emission boundary
/// (size cutoff, block close, or flush) turns them into a `Bulk`. The
/// builder maintains two invariants for the rest of the pipeline:
///
/// - it never stores an empty command
/// - the first-command timestamp exists exactly when the group is non-empty
#[derive(Debug, Default)]
pub struct BulkBuilder {
    /// Accumulated commands
    commands: Vec<String>,

    /// Captured when the first command is pushed, cleared on finish
    first_time: Option<DateTime<Utc>>,
}

impl BulkBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command to the group
    ///
    /// The first push captures the wall-clock time that becomes the
    /// bulk's `first_time`. Empty commands are the caller's bug and are
    /// dropped defensively.
    pub fn push(&mut self, command: String) {
        if command.is_empty() {
            return;
        }
        if self.commands.is_empty() {
            self.first_time = Some(Utc::now());
        }
        self.commands.push(command);
    }

    /// Get the current command count
    #[inline]
    pub fn count(&self) -> usize {
        self.commands.len()
    }

    /// Check if the group is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take the accumulated group as a finished `Bulk`, resetting the builder
    ///
    /// Returns `None` when nothing has been accumulated, so callers can
    /// unconditionally ask for a bulk at every potential boundary without
    /// ever producing an empty one.
    pub fn finish(&mut self, context_id: &ContextId, sequence: u64) -> Option<Bulk> {
        let first_time = self.first_time.take()?;
        if self.commands.is_empty() {
            return None;
        }
        Some(Bulk {
            commands: std::mem::take(&mut self.commands),
            first_time,
            context_id: context_id.clone(),
            sequence,
        })
    }
}
