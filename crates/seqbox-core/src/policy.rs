use serde::{Deserialize, Serialize};

use seqbox_store::validate_path;

use crate::allocator::HintStrategy;
use crate::error::{UploadError, UploadResult};

/// Attempt ceilings for the two conflict-driven loops.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Candidate filenames tried before giving up with
    /// [`UploadError::AllocationExhausted`].
    pub max_name_attempts: u32,
    /// Read-append-write cycles tried before giving up with
    /// [`UploadError::IndexAppendFailed`].
    pub max_index_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_name_attempts: 20,
            max_index_attempts: 5,
        }
    }
}

/// Where entries, the index, and idempotency claims live in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub entries_dir: String,
    pub index_file: String,
    pub claims_dir: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            entries_dir: "photos".into(),
            index_file: "photos/photos.txt".into(),
            claims_dir: ".locks".into(),
        }
    }
}

/// Everything that shapes how a submission is processed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub retry: RetryPolicy,
    pub layout: StoreLayout,
    pub hint_strategy: HintStrategy,
    /// When `true`, a submission without an idempotency token is rejected
    /// instead of being processed unprotected.
    pub require_idempotency_token: bool,
}

impl UploadPolicy {
    pub fn validate(&self) -> UploadResult<()> {
        if self.retry.max_name_attempts == 0 {
            return Err(UploadError::InvalidPolicy(
                "retry.max_name_attempts must be at least 1".into(),
            ));
        }
        if self.retry.max_index_attempts == 0 {
            return Err(UploadError::InvalidPolicy(
                "retry.max_index_attempts must be at least 1".into(),
            ));
        }

        let layout = &self.layout;
        for (field, path) in [
            ("layout.entries_dir", &layout.entries_dir),
            ("layout.index_file", &layout.index_file),
            ("layout.claims_dir", &layout.claims_dir),
        ] {
            validate_path(path)
                .map_err(|e| UploadError::InvalidPolicy(format!("{field}: {e}")))?;
        }
        if layout.claims_dir == layout.entries_dir {
            return Err(UploadError::InvalidPolicy(
                "layout.claims_dir must differ from layout.entries_dir".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_layout() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.retry.max_name_attempts, 20);
        assert_eq!(policy.retry.max_index_attempts, 5);
        assert_eq!(policy.layout.index_file, "photos/photos.txt");
        assert_eq!(policy.hint_strategy, HintStrategy::DirectoryScan);
        assert!(!policy.require_idempotency_token);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut policy = UploadPolicy::default();
        policy.retry.max_index_attempts = 0;
        assert!(matches!(policy.validate(), Err(UploadError::InvalidPolicy(_))));
    }

    #[test]
    fn bad_layout_rejected() {
        let mut policy = UploadPolicy::default();
        policy.layout.claims_dir = "/abs".into();
        assert!(policy.validate().is_err());

        let mut policy = UploadPolicy::default();
        policy.layout.claims_dir = "photos".into();
        assert!(policy.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let policy: UploadPolicy =
            serde_json::from_str(r#"{"retry":{"max_name_attempts":3},"hint_strategy":"index_parse"}"#)
                .unwrap();
        assert_eq!(policy.retry.max_name_attempts, 3);
        assert_eq!(policy.retry.max_index_attempts, 5);
        assert_eq!(policy.hint_strategy, HintStrategy::IndexParse);
        assert_eq!(policy.layout, StoreLayout::default());
    }
}
