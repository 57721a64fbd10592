use thiserror::Error;

/// Errors from a single place-search provider call.
///
/// These never cross the crate's public search boundary: the query fanout
/// absorbs them and the failing query simply contributes zero results.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (network down, DNS, TLS...).
    #[error("provider request failed: {reason}")]
    RequestFailed { reason: String },

    /// The provider rejected the query itself.
    #[error("provider rejected query '{query}': {reason}")]
    QueryRejected { query: String, reason: String },
}

/// Convenience result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;
