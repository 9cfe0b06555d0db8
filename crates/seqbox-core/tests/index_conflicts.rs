//! Index appends racing another writer between read and write.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use seqbox_core::{Submission, UploadError, UploadPolicy, Uploader};
use seqbox_store::{
    InMemoryObjectStore, ObjectStore, Precondition, StoreResult, Versioned, WriteOutcome,
};

const INDEX: &str = "photos/photos.txt";

/// Wraps a store and, before each of the first `interruptions` index
/// writes, appends a foreign line so the caller's version is stale.
struct InterferingStore {
    inner: Arc<InMemoryObjectStore>,
    interruptions: u32,
    interfered: AtomicU32,
}

impl InterferingStore {
    fn new(inner: Arc<InMemoryObjectStore>, interruptions: u32) -> Self {
        Self {
            inner,
            interruptions,
            interfered: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for InterferingStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Versioned>> {
        self.inner.get(path).await
    }

    async fn put(
        &self,
        path: &str,
        content: Bytes,
        precondition: Precondition,
    ) -> StoreResult<WriteOutcome> {
        if path == INDEX && self.interfered.load(Ordering::SeqCst) < self.interruptions {
            let n = self.interfered.fetch_add(1, Ordering::SeqCst) + 1;
            let mut current = self
                .inner
                .content(INDEX)
                .map(|b| String::from_utf8(b.to_vec()).unwrap())
                .unwrap_or_default();
            current.push_str(&format!("9{n:02}.jpg|other writer {n}\n"));
            self.inner.insert(INDEX, current).unwrap();
        }
        self.inner.put(path, content, precondition).await
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<String>> {
        self.inner.list(dir).await
    }

    fn locator(&self, path: &str) -> String {
        self.inner.locator(path)
    }
}

fn index_text(store: &InMemoryObjectStore) -> String {
    String::from_utf8(store.content(INDEX).unwrap().to_vec()).unwrap()
}

#[tokio::test]
async fn conflicting_append_retries_and_keeps_both_lines() {
    let inner = Arc::new(InMemoryObjectStore::new());
    inner.insert(INDEX, "001.jpg|Sunset\n").unwrap();
    inner.insert("photos/001.jpg", "a").unwrap();
    let store = Arc::new(InterferingStore::new(inner.clone(), 1));

    let uploader = Uploader::new(store, UploadPolicy::default()).unwrap();
    let receipt = uploader
        .submit(Submission::new("b", "jpg", "Dawn"))
        .await
        .unwrap();
    assert_eq!(receipt.filename, "002.jpg");

    assert_eq!(
        index_text(&inner),
        "001.jpg|Sunset\n901.jpg|other writer 1\n002.jpg|Dawn\n"
    );
}

#[tokio::test]
async fn conflict_on_missing_index_retries_with_cas() {
    // The index does not exist on first read; another writer creates it
    // before our create-only write lands.
    let inner = Arc::new(InMemoryObjectStore::new());
    let store = Arc::new(InterferingStore::new(inner.clone(), 1));

    let uploader = Uploader::new(store, UploadPolicy::default()).unwrap();
    uploader
        .submit(Submission::new("b", "webp", "first"))
        .await
        .unwrap();

    assert_eq!(index_text(&inner), "901.jpg|other writer 1\n001.webp|first\n");
}

#[tokio::test]
async fn exhausted_append_leaves_image_and_reports_it() {
    let inner = Arc::new(InMemoryObjectStore::new());
    let store = Arc::new(InterferingStore::new(inner.clone(), u32::MAX));

    let uploader = Uploader::new(store, UploadPolicy::default()).unwrap();
    let err = uploader
        .submit(Submission::new("b", "jpg", "lost"))
        .await
        .unwrap_err();

    match err {
        UploadError::IndexAppendFailed { filename, attempts } => {
            assert_eq!(filename, "001.jpg");
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(inner.content("photos/001.jpg").is_some());
    assert!(!index_text(&inner).contains("001.jpg|lost"));
}
