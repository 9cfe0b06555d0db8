//! Filesystem-backed object store.
//!
//! Objects are plain files under a root directory. Create-only writes go
//! through `tempfile`'s `persist_noclobber`, so a reader never sees a
//! half-written object and two creators cannot both win. Versions are BLAKE3
//! hashes of the content.
//!
//! Compare-and-swap is serialized by an in-process mutex, so this backend is
//! only safe when a single process writes to the root.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{validate_path, Precondition, Version, Versioned, WriteOutcome};
use crate::traits::ObjectStore;

/// Prefix of in-flight temporary files; hidden from listings.
const TEMP_PREFIX: &str = ".seqbox-tmp";

fn content_version(content: &[u8]) -> Version {
    Version::new(blake3::hash(content).to_hex().to_string())
}

/// Object store rooted at a local directory.
#[derive(Debug)]
pub struct LocalObjectStore {
    root: PathBuf,
    swap_lock: Mutex<()>,
}

impl LocalObjectStore {
    /// Open a store at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            swap_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    async fn read_file(path: &Path) -> StoreResult<Option<Bytes>> {
        match fs::read(path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `content` to a temp file beside `target`, then move it into
    /// place. With `clobber == false` the move fails if `target` exists.
    async fn persist(target: PathBuf, content: Bytes, clobber: bool) -> StoreResult<bool> {
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| StoreError::Internal(format!("{} has no parent", target.display())))?;
        fs::create_dir_all(&parent).await?;

        tokio::task::spawn_blocking(move || -> StoreResult<bool> {
            let mut tmp = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .tempfile_in(&parent)?;
            tmp.write_all(&content)?;
            tmp.as_file().sync_all()?;

            let persisted = if clobber {
                tmp.persist(&target).map(|_| ())
            } else {
                tmp.persist_noclobber(&target).map(|_| ())
            };
            match persisted {
                Ok(()) => Ok(true),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(StoreError::Io(e.error)),
            }
        })
        .await
        .map_err(|e| StoreError::Internal(format!("blocking task panicked: {e}")))?
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Versioned>> {
        let file = self.resolve(path)?;
        Ok(Self::read_file(&file).await?.map(|content| Versioned {
            version: content_version(&content),
            content,
        }))
    }

    async fn put(
        &self,
        path: &str,
        content: Bytes,
        precondition: Precondition,
    ) -> StoreResult<WriteOutcome> {
        let file = self.resolve(path)?;
        let version = content_version(&content);

        match precondition {
            Precondition::CreateOnly => {
                let created = Self::persist(file, content, false).await?;
                debug!(path, created, "local create-only put");
                Ok(if created {
                    WriteOutcome::Committed(version)
                } else {
                    WriteOutcome::Conflict
                })
            }
            Precondition::Matches(expected) => {
                let _guard = self.swap_lock.lock().await;
                let current = Self::read_file(&file).await?.map(|c| content_version(&c));
                if current.as_ref() != Some(&expected) {
                    debug!(path, %expected, ?current, "local compare-and-swap rejected");
                    return Ok(WriteOutcome::Conflict);
                }
                Self::persist(file, content, true).await?;
                Ok(WriteOutcome::Committed(version))
            }
        }
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<String>> {
        let path = if dir.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir)?
        };

        let mut entries = match fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(TEMP_PREFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn locator(&self, path: &str) -> String {
        format!("file://{}", self.root.join(path).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_read() {
        let (_dir, store) = store().await;
        let outcome = store
            .put("photos/001.jpg", Bytes::from_static(b"img"), Precondition::CreateOnly)
            .await
            .unwrap();
        assert!(outcome.is_committed());

        let read = store.get("photos/001.jpg").await.unwrap().unwrap();
        assert_eq!(&read.content[..], b"img");
        assert_eq!(Some(&read.version), outcome.version());
    }

    #[tokio::test]
    async fn create_only_conflicts_when_present() {
        let (_dir, store) = store().await;
        store
            .put("a.txt", Bytes::from_static(b"1"), Precondition::CreateOnly)
            .await
            .unwrap();
        let second = store
            .put("a.txt", Bytes::from_static(b"2"), Precondition::CreateOnly)
            .await
            .unwrap();
        assert_eq!(second, WriteOutcome::Conflict);

        let read = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(&read.content[..], b"1");
    }

    #[tokio::test]
    async fn compare_and_swap() {
        let (_dir, store) = store().await;
        let v1 = store
            .put("idx.txt", Bytes::from_static(b"a\n"), Precondition::CreateOnly)
            .await
            .unwrap()
            .version()
            .cloned()
            .unwrap();

        let ok = store
            .put("idx.txt", Bytes::from_static(b"a\nb\n"), Precondition::Matches(v1.clone()))
            .await
            .unwrap();
        assert!(ok.is_committed());

        let stale = store
            .put("idx.txt", Bytes::from_static(b"a\nc\n"), Precondition::Matches(v1))
            .await
            .unwrap();
        assert_eq!(stale, WriteOutcome::Conflict);

        let read = store.get("idx.txt").await.unwrap().unwrap();
        assert_eq!(&read.content[..], b"a\nb\n");
    }

    #[tokio::test]
    async fn list_hides_temp_files_and_tolerates_missing_dir() {
        let (dir, store) = store().await;
        assert!(store.list("photos").await.unwrap().is_empty());

        store
            .put("photos/002.png", Bytes::from_static(b"x"), Precondition::CreateOnly)
            .await
            .unwrap();
        std::fs::write(dir.path().join("photos").join(".seqbox-tmpXYZ"), b"partial").unwrap();

        assert_eq!(store.list("photos").await.unwrap(), vec!["002.png"]);
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let (_dir, store) = store().await;
        assert!(store.get("../outside").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_have_single_winner() {
        let (_dir, store) = store().await;
        let store = Arc::new(store);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .put("race.bin", Bytes::from(vec![i as u8]), Precondition::CreateOnly)
                        .await
                        .unwrap()
                        .is_committed()
                })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
