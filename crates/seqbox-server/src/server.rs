use tokio::net::TcpListener;

use seqbox_core::Uploader;

use crate::auth::UploadKey;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Upload server bound to one configured store.
pub struct SeqboxServer {
    config: ServerConfig,
    state: AppState,
}

impl SeqboxServer {
    /// Validate `config`, open its backend, and build the uploader.
    pub async fn from_config(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = config.backend.open().await?;
        let uploader = Uploader::new(store, config.upload.clone())?;
        let state = AppState::new(uploader, UploadKey::new(config.upload_key.clone()));
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_body_bytes)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            hint_strategy = ?self.config.upload.hint_strategy,
            "seqbox server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
