//! One-time claims on client idempotency tokens.
//!
//! A claim is a small JSON object written create-only under the claims
//! directory. The store's refusal to create the same path twice is what
//! makes the claim exclusive; nothing is ever read back.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use seqbox_store::{join_path, ObjectStore, Precondition, WriteOutcome};

use crate::error::{UploadError, UploadResult};

/// Content of a claim object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyClaim {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Store path of the claim for `token`.
///
/// The token is hashed so arbitrary client input always maps to a single
/// well-formed filename inside `claims_dir`.
pub fn claim_path(claims_dir: &str, token: &str) -> String {
    let digest = blake3::hash(token.as_bytes());
    join_path(claims_dir, &format!("{}.json", digest.to_hex()))
}

/// Turns idempotency tokens into exclusive, one-time claims.
pub struct IdempotencyGuard {
    store: Arc<dyn ObjectStore>,
    claims_dir: String,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn ObjectStore>, claims_dir: impl Into<String>) -> Self {
        Self {
            store,
            claims_dir: claims_dir.into(),
        }
    }

    /// Claim `token`.
    ///
    /// Returns `Ok(true)` for the first claim and `Ok(false)` if the token
    /// was claimed before. Store failures are errors, never `false`.
    pub async fn claim(&self, token: &str) -> UploadResult<bool> {
        if token.trim().is_empty() {
            return Err(UploadError::BadRequest(
                "idempotency token must not be blank".into(),
            ));
        }

        let path = claim_path(&self.claims_dir, token);
        let claim = IdempotencyClaim {
            token: token.to_string(),
            created_at: Utc::now(),
        };
        let body = serde_json::to_vec(&claim).map_err(|e| UploadError::Serialization(e.to_string()))?;

        match self
            .store
            .put(&path, Bytes::from(body), Precondition::CreateOnly)
            .await?
        {
            WriteOutcome::Committed(_) => {
                debug!(path = %path, "idempotency token claimed");
                Ok(true)
            }
            WriteOutcome::Conflict => {
                warn!(path = %path, "idempotency token already claimed");
                Ok(false)
            }
        }
    }
}
