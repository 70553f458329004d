//! Pipeline error types

use thiserror::Error;

/// Errors that can occur while setting up the dispatcher
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A worker thread could not be spawned
    #[error("failed to spawn worker thread '{name}': {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The configured file worker pool size is zero
    #[error("file worker pool must hold at least one worker")]
    EmptyPool,
}
