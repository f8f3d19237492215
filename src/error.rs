//! Crate-wide error handling.
//!
//! The streaming core itself has no recoverable failures; errors surface
//! only at construction time (bad configuration, worker spawn).

use thiserror::Error;

/// Type alias for terrain operation results
pub type TerrainResult<T> = Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    #[error("failed to spawn chunk worker: {message}")]
    WorkerSpawnFailed { message: String },
}
