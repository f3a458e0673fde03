//! Error types for the area reconciler.

use thiserror::Error;

/// Result type for reconciler handle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`crate::AreaHandle`].
#[derive(Debug, Error)]
pub enum Error {
    /// The reconciler task has stopped
    #[error("Area reconciler closed")]
    Closed,
}
