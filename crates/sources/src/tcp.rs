//! TCP Source - newline-delimited command streams over TCP
//!
//! Accepts TCP connections and forwards every inbound chunk into a
//! per-connection session context. Framing is the session's concern: the
//! source hands over raw bytes exactly as they arrive, so commands may be
//! split across TCP segments arbitrarily.
//!
//! # Design
//!
//! - **One session per connection**: `connect` on accept, `receive` per
//!   chunk, `disconnect` on EOF, error, or cancellation
//! - **Per-connection tasks**: each connection is handled by its own task
//! - **Cooperative shutdown**: the accept loop and every connection task
//!   stop on the shared `CancellationToken`
//!
//! # Example
//!
//! ```ignore
//! use bulk_sources::tcp::{TcpSource, TcpSourceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = TcpSourceConfig {
//!     port: 9000,
//!     bulk_size: 3,
//!     ..Default::default()
//! };
//!
//! let source = TcpSource::new(config);
//! source.run(CancellationToken::new()).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Default listen port
const DEFAULT_PORT: u16 = 9000;

/// Default static bulk size handed to each session
const DEFAULT_BULK_SIZE: usize = 3;

/// Default read buffer size per connection
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// TCP source configuration
#[derive(Debug, Clone)]
pub struct TcpSourceConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Static bulk size passed to `connect` for every session
    pub bulk_size: usize,

    /// Read buffer size per connection
    pub buffer_size: usize,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,
}

impl Default for TcpSourceConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            bulk_size: DEFAULT_BULK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            nodelay: true,
        }
    }
}

impl TcpSourceConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// TCP source metrics
#[derive(Debug, Default)]
pub struct TcpSourceMetrics {
    /// Currently active connections
    pub connections_active: AtomicU64,

    /// Total connections accepted
    pub connections_total: AtomicU64,

    /// Total bytes forwarded into sessions
    pub bytes_received: AtomicU64,

    /// Connection-level errors
    pub errors: AtomicU64,
}

impl TcpSourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Increment active connections
    #[inline]
    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections
    #[inline]
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record forwarded bytes
    #[inline]
    pub fn bytes_forwarded(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a connection error
    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub connections_total: u64,
    pub bytes_received: u64,
    pub errors: u64,
}

/// TCP source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session layer refused to open a context
    #[error("session layer unavailable")]
    SessionUnavailable,
}

/// TCP front-end forwarding connection bytes into sessions
pub struct TcpSource {
    /// Configuration
    config: TcpSourceConfig,

    /// Metrics
    metrics: Arc<TcpSourceMetrics>,
}

impl TcpSource {
    /// Create a new TCP source
    pub fn new(config: TcpSourceConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(TcpSourceMetrics::new()),
        }
    }

    /// Get a shared handle to the source metrics
    ///
    /// The handle remains valid after `run()` consumes the source.
    pub fn metrics(&self) -> Arc<TcpSourceMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Bind to the configured address and accept connections until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SourceError> {
        let bind_addr = self.config.bind_address();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SourceError::Bind {
                address: bind_addr,
                source: e,
            })?;

        self.run_with_listener(listener, cancel).await
    }

    /// Accept connections on an already-bound listener until cancelled
    ///
    /// Useful when the caller needs the bound address first (e.g. binding
    /// to port 0) or inherits a socket.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), SourceError> {
        tracing::info!(
            address = %listener.local_addr()?,
            bulk_size = self.config.bulk_size,
            "TCP source listening"
        );

        let source = Arc::new(self);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("TCP source stopping");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            source.metrics.connection_opened();

                            let source = Arc::clone(&source);
                            let cancel = cancel.clone();
                            tokio::spawn(async move {
                                if let Err(e) = source.handle_connection(stream, peer, cancel).await {
                                    source.metrics.error();
                                    tracing::warn!(%peer, error = %e, "connection failed");
                                }
                                source.metrics.connection_closed();
                            });
                        }
                        Err(e) => {
                            source.metrics.error();
                            tracing::warn!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Pump one connection's bytes into its session until it ends
    ///
    /// The session handle never outlives this function: whatever ends the
    /// connection (EOF, I/O error, cancellation), the context is
    /// disconnected, which flushes any unterminated trailing command.
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<(), SourceError> {
        if self.config.nodelay {
            stream.set_nodelay(true)?;
        }

        let handle = bulk_session::connect(self.config.bulk_size);
        if handle.is_null() {
            return Err(SourceError::SessionUnavailable);
        }
        tracing::debug!(%peer, session = %handle, "session opened");

        let mut buffer = BytesMut::with_capacity(self.config.buffer_size);
        let result = loop {
            buffer.clear();
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                read = stream.read_buf(&mut buffer) => match read {
                    Ok(0) => break Ok(()),
                    Ok(n) => {
                        self.metrics.bytes_forwarded(n as u64);
                        bulk_session::receive(handle, &buffer);
                    }
                    Err(e) => break Err(SourceError::Io(e)),
                }
            }
        };

        bulk_session::disconnect(handle);
        tracing::debug!(%peer, session = %handle, "session closed");
        result
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
