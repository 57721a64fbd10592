use thiserror::Error;

/// Errors from remote-sync calls. Fully internal: logged by the detached
/// sync tasks, never surfaced to search callers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport or HTTP-status failure.
    #[error("sync request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured base URL could not be used to build a client.
    #[error("invalid sync base URL '{value}'")]
    InvalidBaseUrl { value: String },
}

/// Convenience result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
