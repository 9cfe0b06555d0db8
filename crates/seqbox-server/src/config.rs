use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seqbox_core::UploadPolicy;
use seqbox_store::{GitHubConfig, GitHubStore, InMemoryObjectStore, LocalObjectStore, ObjectStore};

use crate::error::{ServerError, ServerResult};

/// Where uploads are stored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// Files under `root`. Only one process may write to it.
    Local { root: PathBuf },
    /// One branch of a GitHub repository.
    Github(GitHubConfig),
}

impl BackendConfig {
    /// Open the configured store.
    pub async fn open(&self) -> ServerResult<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = match self {
            Self::Memory => Arc::new(InMemoryObjectStore::new()),
            Self::Local { root } => Arc::new(LocalObjectStore::open(root).await?),
            Self::Github(github) => Arc::new(GitHubStore::new(github.clone())?),
        };
        Ok(store)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local { .. } => "local",
            Self::Github(_) => "github",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared secret clients must send as `key`.
    pub upload_key: String,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    pub upload: UploadPolicy,
    pub backend: BackendConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            upload_key: String::new(),
            max_body_bytes: 16 * 1024 * 1024,
            upload: UploadPolicy::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded server config");
        Ok(config)
    }

    /// Apply `SEQBOX_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> ServerResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `SEQBOX_*` overrides looked up through `lookup`.
    ///
    /// Setting `SEQBOX_GITHUB_OWNER` or `SEQBOX_GITHUB_REPO` switches a
    /// non-GitHub backend to GitHub.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SEQBOX_BIND_ADDR") {
            self.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("SEQBOX_BIND_ADDR={addr:?}: {e}")))?;
        }
        if let Some(key) = lookup("SEQBOX_UPLOAD_KEY") {
            self.upload_key = key;
        }

        let owner = lookup("SEQBOX_GITHUB_OWNER");
        let repo = lookup("SEQBOX_GITHUB_REPO");
        if !matches!(self.backend, BackendConfig::Github(_)) && (owner.is_some() || repo.is_some()) {
            self.backend = BackendConfig::Github(GitHubConfig::new("", "", ""));
        }
        if let BackendConfig::Github(github) = &mut self.backend {
            if let Some(owner) = owner {
                github.owner = owner;
            }
            if let Some(repo) = repo {
                github.repo = repo;
            }
            if let Some(branch) = lookup("SEQBOX_GITHUB_BRANCH") {
                github.branch = branch;
            }
            if let Some(token) = lookup("SEQBOX_GITHUB_TOKEN") {
                github.token = token;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.upload_key.trim().is_empty() {
            return Err(ServerError::Config("upload_key must be set".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(ServerError::Config("max_body_bytes must be positive".into()));
        }
        self.upload
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        match &self.backend {
            BackendConfig::Memory => {}
            BackendConfig::Local { root } => {
                if root.as_os_str().is_empty() {
                    return Err(ServerError::Config("backend.root must be set".into()));
                }
            }
            BackendConfig::Github(github) => {
                for (field, value) in [
                    ("owner", &github.owner),
                    ("repo", &github.repo),
                    ("branch", &github.branch),
                    ("token", &github.token),
                ] {
                    if value.trim().is_empty() {
                        return Err(ServerError::Config(format!("backend.{field} must be set")));
                    }
                }
                if github.timeout_secs == 0 {
                    return Err(ServerError::Config("backend.timeout_secs must be positive".into()));
                }
            }
        }
        tracing::debug!(backend = self.backend.name(), "server config validated");
        Ok(())
    }
}
