//! Server configuration
//!
//! Layered in the usual order: built-in defaults, then an optional TOML
//! file, then command-line overrides (applied in `main`).
//!
//! # Example
//!
//! ```toml
//! [listen]
//! address = "0.0.0.0"
//! port = 9000
//!
//! [bulk]
//! size = 3
//!
//! [dispatch]
//! file_workers = 2
//! output_dir = "."
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level server configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listener settings
    pub listen: ListenConfig,

    /// Bulk assembly settings
    pub bulk: BulkConfig,

    /// Dispatcher / worker pool settings
    pub dispatch: DispatchConfig,
}

/// TCP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 9000
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9000,
        }
    }
}

/// Bulk assembly settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Static block size for every session; 0 disables size-based
    /// emission so only `{` ... `}` blocks produce bulks
    pub size: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { size: 3 }
    }
}

/// Dispatcher / worker pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of file workers (copies of every bulk on disk)
    pub file_workers: usize,

    /// Directory the per-bulk files are written into
    pub output_dir: PathBuf,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            file_workers: bulk_session::DEFAULT_FILE_WORKERS,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config '{}': {e}", path.display()))?;
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("cannot parse config '{}': {e}", path.display()))?;
        Ok(config)
    }
}
