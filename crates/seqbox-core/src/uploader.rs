//! End-to-end submission: claim, allocate, write the image, append the index.
//!
//! The image write and the index append are two separately committed store
//! writes. If the append gives up, the image stays in place without an index
//! line; the error names the orphaned file and nothing is rolled back.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use seqbox_store::{join_path, ObjectStore, Precondition, WriteOutcome};

use crate::allocator::{read_index, SequenceAllocator};
use crate::entry::{format_filename, Entry, Extension, MAX_NUMBER};
use crate::error::{UploadError, UploadResult};
use crate::guard::IdempotencyGuard;
use crate::index::{append_record, IndexRecord};
use crate::policy::UploadPolicy;

/// A decoded client submission.
#[derive(Clone, Debug)]
pub struct Submission {
    pub content: Bytes,
    /// Raw extension as supplied by the client; normalized on submit.
    pub extension: String,
    pub title: String,
    pub idempotency_token: Option<String>,
}

impl Submission {
    pub fn new(content: impl Into<Bytes>, extension: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extension: extension.into(),
            title: title.into(),
            idempotency_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.idempotency_token = Some(token.into());
        self
    }
}

/// Identity of a committed upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub number: u32,
    pub filename: String,
    pub raw_locator: String,
}

/// Drives a submission through the store.
///
/// Holds no state between submissions; every coordination decision is made
/// by the store's create-only and compare-and-swap writes, so any number of
/// `Uploader`s (in one process or many) can share a store.
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
    allocator: SequenceAllocator,
    guard: IdempotencyGuard,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, policy: UploadPolicy) -> UploadResult<Self> {
        policy.validate()?;
        let allocator =
            SequenceAllocator::new(store.clone(), policy.layout.clone(), policy.hint_strategy);
        let guard = IdempotencyGuard::new(store.clone(), policy.layout.claims_dir.clone());
        Ok(Self {
            store,
            policy,
            allocator,
            guard,
        })
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn allocator(&self) -> &SequenceAllocator {
        &self.allocator
    }

    /// Store `submission` as the next numbered entry and index it.
    pub async fn submit(&self, submission: Submission) -> UploadResult<UploadReceipt> {
        let extension = Extension::parse(&submission.extension)?;
        if submission.content.is_empty() {
            return Err(UploadError::BadRequest("missing file content".into()));
        }
        let token = submission
            .idempotency_token
            .as_deref()
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                if !self.guard.claim(token).await? {
                    return Err(UploadError::DuplicateSubmission);
                }
            }
            None if self.policy.require_idempotency_token => {
                return Err(UploadError::BadRequest("missing idempotency token".into()));
            }
            None => {}
        }

        let hint = self.allocator.next_number().await?;
        let (number, path) = self
            .write_image(hint, extension, submission.content)
            .await?;
        let entry = Entry::new(number, extension, &submission.title);
        let filename = entry.filename();

        self.append_index(&entry.index_record()).await?;

        info!(%filename, hint, "upload committed");
        Ok(UploadReceipt {
            number,
            raw_locator: self.store.locator(&path),
            filename,
        })
    }

    /// Create-only write at successive numbers starting from `start` until
    /// one is free.
    async fn write_image(
        &self,
        start: u32,
        extension: Extension,
        content: Bytes,
    ) -> UploadResult<(u32, String)> {
        let mut number = start;
        let mut attempts = 0;

        while attempts < self.policy.retry.max_name_attempts && number <= MAX_NUMBER {
            attempts += 1;
            let path = join_path(
                &self.policy.layout.entries_dir,
                &format_filename(number, extension),
            );
            match self
                .store
                .put(&path, content.clone(), Precondition::CreateOnly)
                .await?
            {
                WriteOutcome::Committed(_) => return Ok((number, path)),
                WriteOutcome::Conflict => {
                    debug!(path = %path, attempts, "entry filename taken, trying next number");
                    number += 1;
                }
            }
        }

        warn!(start, attempts, "no free entry filename");
        Err(UploadError::AllocationExhausted {
            first: start,
            attempts,
        })
    }

    /// Read-append-write of the index, restarted from a fresh read whenever
    /// another writer got in between.
    async fn append_index(&self, record: &IndexRecord) -> UploadResult<()> {
        let path = &self.policy.layout.index_file;
        let max_attempts = self.policy.retry.max_index_attempts;

        for attempt in 1..=max_attempts {
            let (existing, version) = match read_index(self.store.as_ref(), path).await? {
                Some((text, version)) => (text, Some(version)),
                None => (String::new(), None),
            };
            let updated = append_record(&existing, record);

            match self
                .store
                .put(path, Bytes::from(updated), Precondition::from_observed(version))
                .await?
            {
                WriteOutcome::Committed(_) => return Ok(()),
                WriteOutcome::Conflict => {
                    debug!(path = %path, attempt, "index changed underneath us, retrying append");
                }
            }
        }

        error!(
            filename = %record.filename,
            attempts = max_attempts,
            "entry stored without an index line"
        );
        Err(UploadError::IndexAppendFailed {
            filename: record.filename.clone(),
            attempts: max_attempts,
        })
    }
}
