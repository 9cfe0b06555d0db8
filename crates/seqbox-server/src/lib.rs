//! HTTP front end for seqbox.
//!
//! Exposes `POST /upload`, which checks the shared upload key, decodes the
//! base64 image, and hands it to [`seqbox_core::Uploader`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod payload;
pub mod router;
pub mod server;

pub use auth::UploadKey;
pub use config::{BackendConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use payload::{UploadRequest, UploadResponse};
pub use server::SeqboxServer;
