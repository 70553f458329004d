//! Bulk Collector - Sources
//!
//! Network front-ends that feed producer bytes into the session API.
//! A source never inspects session state: it obtains a handle per
//! producer, forwards raw bytes, and disconnects when the producer goes
//! away. All parsing and batching happens behind the session boundary.
//!
//! ```text
//! [TCP client] --bytes--> [connection task] --receive(handle, ..)--> [session]
//! ```

/// TCP source - one session per accepted connection
pub mod tcp;

pub use tcp::{SourceError, TcpSource, TcpSourceConfig, TcpSourceMetrics};
