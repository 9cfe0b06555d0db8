use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::json;

use seqbox_core::Uploader;

use crate::auth::UploadKey;
use crate::error::{ServerError, ServerResult};
use crate::payload::{UploadRequest, UploadResponse};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub uploader: Arc<Uploader>,
    pub upload_key: Arc<UploadKey>,
}

impl AppState {
    pub fn new(uploader: Uploader, upload_key: UploadKey) -> Self {
        Self {
            uploader: Arc::new(uploader),
            upload_key: Arc::new(upload_key),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `POST /upload`.
pub async fn upload_handler(
    State(state): State<AppState>,
    body: Result<Json<UploadRequest>, JsonRejection>,
) -> ServerResult<Json<UploadResponse>> {
    let Json(request) = body.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ServerError::PayloadTooLarge,
        _ => ServerError::BadRequest(e.body_text()),
    })?;

    if !state.upload_key.verify(request.key.as_deref()) {
        tracing::warn!("upload rejected: bad key");
        return Err(ServerError::Unauthorized);
    }

    let submission = request.into_submission()?;
    let receipt = state.uploader.submit(submission).await?;
    Ok(Json(receipt.into()))
}

/// Bare `OPTIONS /upload`; CORS preflights never get here.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let policy = state.uploader.policy();
    Json(json!({
        "name": "seqbox-server",
        "version": env!("CARGO_PKG_VERSION"),
        "hint_strategy": policy.hint_strategy,
        "entries_dir": policy.layout.entries_dir,
        "require_idempotency_token": policy.require_idempotency_token,
    }))
}
