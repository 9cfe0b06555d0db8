/// Errors from object store operations.
///
/// Write conflicts are not errors: they are reported through
/// [`WriteOutcome::Conflict`](crate::WriteOutcome::Conflict) so callers can
/// drive their own retry loops.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is empty, absolute, or escapes the store root.
    #[error("invalid store path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure talking to a remote backend.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote backend answered with an unexpected status.
    #[error("upstream returned {status} for {path}: {message}")]
    Upstream {
        status: u16,
        path: String,
        message: String,
    },

    /// The stored data could not be decoded.
    #[error("corrupt object at {path}: {reason}")]
    CorruptObject { path: String, reason: String },

    /// Lock poisoning, panicked blocking tasks and similar.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
