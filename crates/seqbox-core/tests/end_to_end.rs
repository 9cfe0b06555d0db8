//! The documented walk-through, on each backend that runs offline.

use std::sync::Arc;

use seqbox_core::{HintStrategy, Submission, UploadPolicy, Uploader};
use seqbox_store::{InMemoryObjectStore, LocalObjectStore, ObjectStore, Precondition};

async fn seed(store: &dyn ObjectStore) {
    for (path, body) in [
        ("photos/001.jpg", &b"sunset"[..]),
        ("photos/002.jpg", &b"dawn"[..]),
        ("photos/photos.txt", &b"001.jpg|Sunset\n002.jpg|Dawn\n"[..]),
    ] {
        let outcome = store
            .put(path, bytes::Bytes::copy_from_slice(body), Precondition::CreateOnly)
            .await
            .unwrap();
        assert!(outcome.is_committed());
    }
}

async fn walk_through(store: Arc<dyn ObjectStore>, strategy: HintStrategy) -> String {
    seed(store.as_ref()).await;
    let policy = UploadPolicy {
        hint_strategy: strategy,
        ..UploadPolicy::default()
    };
    let uploader = Uploader::new(store.clone(), policy).unwrap();
    assert_eq!(uploader.allocator().next_number().await.unwrap(), 3);

    let receipt = uploader
        .submit(Submission::new("noon", "jpg", "Noon"))
        .await
        .unwrap();
    assert_eq!(receipt.filename, "003.jpg");
    assert!(receipt.raw_locator.ends_with("/photos/003.jpg"));

    let index = store.get("photos/photos.txt").await.unwrap().unwrap();
    String::from_utf8(index.content.to_vec()).unwrap()
}

const EXPECTED_INDEX: &str = "001.jpg|Sunset\n002.jpg|Dawn\n003.jpg|Noon\n";

#[tokio::test]
async fn in_memory_directory_scan() {
    let store = Arc::new(InMemoryObjectStore::with_base_url("https://raw.example/gallery"));
    let index = walk_through(store, HintStrategy::DirectoryScan).await;
    assert_eq!(index, EXPECTED_INDEX);
}

#[tokio::test]
async fn in_memory_index_parse() {
    let store = Arc::new(InMemoryObjectStore::new());
    let index = walk_through(store, HintStrategy::IndexParse).await;
    assert_eq!(index, EXPECTED_INDEX);
}

#[tokio::test]
async fn local_directory_scan() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LocalObjectStore::open(dir.path()).await.unwrap());
    let index = walk_through(store, HintStrategy::DirectoryScan).await;
    assert_eq!(index, EXPECTED_INDEX);
    assert_eq!(std::fs::read(dir.path().join("photos/003.jpg")).unwrap(), b"noon");
}
