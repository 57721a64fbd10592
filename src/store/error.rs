use thiserror::Error;

/// Errors from snapshot load/save.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience result type for snapshot operations.
pub type StoreResult<T> = Result<T, StoreError>;
