//! Error types for the simulator.

use thiserror::Error;

/// Result type for simulator runs.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Synchronizer or hub failure
    #[error("Sync error: {0}")]
    Sync(#[from] rendezvous_sync::Error),

    /// Reconciler task failure
    #[error("Area error: {0}")]
    Area(#[from] rendezvous_area::Error),

    /// The meeting area did not settle in time
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
