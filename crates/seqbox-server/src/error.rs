use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use seqbox_core::{ErrorKind, UploadError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("store error: {0}")]
    Store(#[from] seqbox_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status and machine-readable kind reported to the client.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorKind::BadRequest.as_str()),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::Upload(e) => {
                let kind = e.kind();
                let status = match kind {
                    ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                    ErrorKind::DuplicateSubmission => StatusCode::CONFLICT,
                    ErrorKind::AllocationExhausted
                    | ErrorKind::IndexAppendFailed
                    | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
                };
                (status, kind.as_str())
            }
            Self::Store(_) => (StatusCode::BAD_GATEWAY, ErrorKind::Upstream.as_str()),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal.as_str())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(kind, error = %self, "upload request failed");
        } else {
            tracing::debug!(kind, error = %self, "upload request rejected");
        }
        (
            status,
            Json(json!({
                "error": self.to_string(),
                "kind": kind,
            })),
        )
            .into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
