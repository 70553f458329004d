//! Context identification types
//!
//! `ContextId` identifies the producer context that emitted a bulk.

use std::fmt;

/// Identity of a producer context
///
/// Each context is assigned an id from a process-wide monotonically
/// increasing counter at creation. The id travels with every bulk the
/// context emits and ends up in the file sink's filenames, so it is kept
/// as text rather than a bare integer.
///
/// # Example
///
/// ```
/// use bulk_protocol::ContextId;
///
/// let id = ContextId::from_index(7);
/// assert_eq!(id.as_str(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    /// Create a context id from an arbitrary string
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a context id from a counter value
    #[inline]
    pub fn from_index(index: u64) -> Self {
        Self(index.to_string())
    }

    /// Get the context id as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContextId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContextId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ContextId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
