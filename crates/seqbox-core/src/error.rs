//! Error types for the upload protocol.

use seqbox_store::StoreError;
use thiserror::Error;

/// Coarse classification of an [`UploadError`], stable enough to expose to
/// clients as a machine-readable error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    DuplicateSubmission,
    AllocationExhausted,
    IndexAppendFailed,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::DuplicateSubmission => "duplicate_submission",
            Self::AllocationExhausted => "allocation_exhausted",
            Self::IndexAppendFailed => "index_append_failed",
            Self::Upstream => "upstream",
            Self::Internal => "internal",
        }
    }
}

/// Errors that can occur while submitting an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The submission is malformed. Nothing was written.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The extension is not on the allow-list. Nothing was written.
    #[error("unsupported extension {0:?}: expected one of jpg, jpeg, png, webp")]
    UnsupportedExtension(String),

    /// The idempotency token was already claimed by an earlier submission.
    #[error("duplicate submission")]
    DuplicateSubmission,

    /// Every candidate filename was taken. The image was not written.
    #[error("no free filename after {attempts} attempts starting at {first:03}")]
    AllocationExhausted { first: u32, attempts: u32 },

    /// The image was written but the index line could not be appended.
    #[error("{filename} was stored but the index was not updated after {attempts} attempts")]
    IndexAppendFailed { filename: String, attempts: u32 },

    /// The index exists but is not valid UTF-8 text.
    #[error("corrupt index {path}: {reason}")]
    CorruptIndex { path: String, reason: String },

    /// The upload policy is unusable.
    #[error("invalid upload policy: {0}")]
    InvalidPolicy(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object store failed for a reason other than a write conflict.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) | Self::UnsupportedExtension(_) => ErrorKind::BadRequest,
            Self::DuplicateSubmission => ErrorKind::DuplicateSubmission,
            Self::AllocationExhausted { .. } => ErrorKind::AllocationExhausted,
            Self::IndexAppendFailed { .. } => ErrorKind::IndexAppendFailed,
            Self::Store(_) => ErrorKind::Upstream,
            Self::CorruptIndex { .. } | Self::InvalidPolicy(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Convenience type alias for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
