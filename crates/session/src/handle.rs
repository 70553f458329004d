//! Opaque context handles

use std::fmt;

/// Opaque, process-scoped token identifying one context
///
/// Handles are minted from a monotonically increasing counter and never
/// reused within a process; they deliberately carry no pointer or index
/// semantics. The null handle (`ContextHandle::NULL`) is returned by a
/// failed `connect` and is ignored by every other operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    /// The sentinel returned when a context could not be created
    pub const NULL: Self = Self(0);

    /// Check whether this is the null sentinel
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Mint a handle from a counter value (crate-internal)
    #[inline]
    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
