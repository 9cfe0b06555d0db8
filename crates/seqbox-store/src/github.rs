//! Object store on top of the GitHub repository contents API.
//!
//! Every object is a file on one branch of a repository. The version token
//! is the file's blob SHA: GitHub refuses a PUT without `sha` when the file
//! exists (422) and a PUT with a stale `sha` (409), which gives create-only
//! and compare-and-swap semantics respectively.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{validate_path, Precondition, Version, Versioned, WriteOutcome};
use crate::traits::ObjectStore;

const API_VERSION: &str = "2022-11-28";

fn default_api_base() -> String {
    "https://api.github.com".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for [`GitHubStore`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Token with `contents: write` on the repository.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GitHubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: default_branch(),
            token: token.into(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize)]
struct FileBody {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsBody {
    File(FileBody),
    Directory(Vec<DirEntry>),
}

#[derive(Deserialize)]
struct DirEntry {
    name: String,
}

#[derive(Serialize)]
struct PutBody<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decode the line-wrapped base64 `content` field of a file response.
fn decode_content(path: &str, encoded: &str) -> StoreResult<Bytes> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64
        .decode(compact)
        .map(Bytes::from)
        .map_err(|e| StoreError::CorruptObject {
            path: path.to_string(),
            reason: format!("invalid base64 content: {e}"),
        })
}

/// Commit message recorded for a write.
fn commit_message(path: &str, precondition: &Precondition) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match precondition {
        Precondition::CreateOnly => format!("create {name}"),
        Precondition::Matches(_) => format!("update {name}"),
    }
}

/// Whether a rejected PUT means the write's precondition failed.
///
/// GitHub answers 422 when a file created without `sha` already exists and
/// 409 when the supplied `sha` is stale. A 409 on a create can also mean the
/// branch ref moved mid-commit; that is an upstream failure, not an
/// occupied path.
fn precondition_failed(status: StatusCode, precondition: &Precondition) -> bool {
    match precondition {
        Precondition::CreateOnly => status == StatusCode::UNPROCESSABLE_ENTITY,
        Precondition::Matches(_) => status == StatusCode::CONFLICT,
    }
}

/// [`ObjectStore`] backed by one branch of a GitHub repository.
#[derive(Clone, Debug)]
pub struct GitHubStore {
    client: Client,
    config: GitHubConfig,
}

impl GitHubStore {
    pub fn new(config: GitHubConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("seqbox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path}` with every path
    /// segment percent-encoded.
    fn contents_url(&self, path: &str) -> StoreResult<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| StoreError::Internal(format!("invalid api_base: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Internal("api_base cannot be a base URL".into()))?;
            segments
                .pop_if_empty()
                .extend([
                    "repos",
                    self.config.owner.as_str(),
                    self.config.repo.as_str(),
                    "contents",
                ]);
            if !path.is_empty() {
                segments.extend(path.split('/'));
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if self.config.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.token)
        }
    }

    /// GET the contents endpoint; `Ok(None)` on 404.
    async fn fetch(&self, path: &str) -> StoreResult<Option<ContentsBody>> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);

        let response = self.request(reqwest::Method::GET, url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => Err(upstream_error(path, response).await),
        }
    }
}

async fn upstream_error(path: &str, response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);
    StoreError::Upstream {
        status,
        path: path.to_string(),
        message,
    }
}

#[async_trait]
impl ObjectStore for GitHubStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Versioned>> {
        validate_path(path)?;
        match self.fetch(path).await? {
            None => Ok(None),
            Some(ContentsBody::Directory(_)) => Err(StoreError::CorruptObject {
                path: path.to_string(),
                reason: "path is a directory".into(),
            }),
            Some(ContentsBody::File(file)) => {
                if file.encoding != "base64" {
                    return Err(StoreError::CorruptObject {
                        path: path.to_string(),
                        reason: format!("unsupported encoding {:?}", file.encoding),
                    });
                }
                Ok(Some(Versioned {
                    content: decode_content(path, &file.content)?,
                    version: Version::new(file.sha),
                }))
            }
        }
    }

    async fn put(
        &self,
        path: &str,
        content: Bytes,
        precondition: Precondition,
    ) -> StoreResult<WriteOutcome> {
        validate_path(path)?;
        let url = self.contents_url(path)?;
        let body = PutBody {
            message: commit_message(path, &precondition),
            content: BASE64.encode(&content),
            branch: &self.config.branch,
            sha: match &precondition {
                Precondition::CreateOnly => None,
                Precondition::Matches(v) => Some(v.as_str()),
            },
        };

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let created: PutResponse = response.json().await?;
            Ok(WriteOutcome::Committed(Version::new(created.content.sha)))
        } else if precondition_failed(status, &precondition) {
            debug!(path, %status, "github put rejected by precondition");
            Ok(WriteOutcome::Conflict)
        } else {
            warn!(path, %status, "github put failed");
            Err(upstream_error(path, response).await)
        }
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<String>> {
        if !dir.is_empty() {
            validate_path(dir)?;
        }
        match self.fetch(dir).await? {
            None => Ok(Vec::new()),
            Some(ContentsBody::File(_)) => Err(StoreError::CorruptObject {
                path: dir.to_string(),
                reason: "path is a file, not a directory".into(),
            }),
            Some(ContentsBody::Directory(entries)) => {
                let mut names: Vec<String> = entries.into_iter().map(|e| e.name).collect();
                names.sort();
                Ok(names)
            }
        }
    }

    fn locator(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            self.config.branch,
            path
        )
    }
}
