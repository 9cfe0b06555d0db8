//! Wire format of the upload endpoint.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use seqbox_core::{Submission, UploadReceipt};

use crate::error::{ServerError, ServerResult};

/// Body of `POST /upload`.
///
/// Older clients send `contentBase64`, `ext` and `nonce`; those names are
/// accepted as aliases.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "contentBase64")]
    pub content: String,
    #[serde(default, alias = "ext")]
    pub extension: String,
    #[serde(default, alias = "nonce")]
    pub idempotency_token: Option<String>,
}

impl UploadRequest {
    /// Decode into a [`Submission`]. Call only after the key was checked.
    pub fn into_submission(self) -> ServerResult<Submission> {
        if self.content.trim().is_empty() || self.extension.trim().is_empty() {
            return Err(ServerError::BadRequest("missing file or ext".into()));
        }
        let content = decode_content(&self.content)?;
        let mut submission = Submission::new(content, self.extension, self.title);
        submission.idempotency_token = self.idempotency_token;
        Ok(submission)
    }
}

/// Body of a successful `POST /upload`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    pub filename: String,
    pub raw_locator: String,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            ok: true,
            filename: receipt.filename,
            raw_locator: receipt.raw_locator,
        }
    }
}

/// Strip a `data:<mime>;base64,` prefix, if present.
pub fn strip_data_url(raw: &str) -> &str {
    raw.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .filter(|(mime, _)| !mime.is_empty() && !mime.contains(';'))
        .map_or(raw, |(_, payload)| payload)
}

/// Decode base64 content, with or without a data-URL prefix.
pub fn decode_content(raw: &str) -> ServerResult<Bytes> {
    let payload: String = strip_data_url(raw.trim())
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let decoded = BASE64
        .decode(payload)
        .map_err(|e| ServerError::BadRequest(format!("content is not valid base64: {e}")))?;
    if decoded.is_empty() {
        return Err(ServerError::BadRequest("missing file or ext".into()));
    }
    Ok(Bytes::from(decoded))
}
