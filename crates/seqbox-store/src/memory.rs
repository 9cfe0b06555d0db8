use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::object::{validate_path, Precondition, Version, Versioned, WriteOutcome};
use crate::traits::ObjectStore;

#[derive(Clone, Debug)]
struct Slot {
    content: Bytes,
    generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Slot>,
    clock: u64,
}

impl Inner {
    fn commit(&mut self, path: &str, content: Bytes) -> Version {
        self.clock += 1;
        let generation = self.clock;
        self.objects
            .insert(path.to_string(), Slot { content, generation });
        generation_version(generation)
    }
}

fn generation_version(generation: u64) -> Version {
    Version::new(format!("g{generation}"))
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and single-process deployments. Every committed write
/// takes the next value of a store-wide generation counter, so versions are
/// never reused. Preconditions are checked and applied under one write lock.
pub struct InMemoryObjectStore {
    inner: RwLock<Inner>,
    base_url: String,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::with_base_url("memory://store")
    }

    /// Create an empty store whose locators start with `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn read_inner(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {e}")))
    }

    fn write_inner(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {e}")))
    }

    /// Unconditionally write `content` at `path`, for seeding fixtures.
    pub fn insert(&self, path: &str, content: impl Into<Bytes>) -> StoreResult<Version> {
        validate_path(path)?;
        Ok(self.write_inner()?.commit(path, content.into()))
    }

    /// Current content at `path`, without its version.
    pub fn content(&self, path: &str) -> Option<Bytes> {
        self.read_inner()
            .ok()?
            .objects
            .get(path)
            .map(|slot| slot.content.clone())
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read_inner().map(|i| i.objects.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of every stored path.
    pub fn paths(&self) -> Vec<String> {
        let Ok(inner) = self.read_inner() else {
            return Vec::new();
        };
        let mut paths: Vec<String> = inner.objects.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Versioned>> {
        validate_path(path)?;
        let inner = self.read_inner()?;
        Ok(inner.objects.get(path).map(|slot| Versioned {
            content: slot.content.clone(),
            version: generation_version(slot.generation),
        }))
    }

    async fn put(
        &self,
        path: &str,
        content: Bytes,
        precondition: Precondition,
    ) -> StoreResult<WriteOutcome> {
        validate_path(path)?;
        let mut inner = self.write_inner()?;
        let current = inner.objects.get(path).map(|s| generation_version(s.generation));

        let allowed = match (&precondition, &current) {
            (Precondition::CreateOnly, None) => true,
            (Precondition::Matches(expected), Some(actual)) => expected == actual,
            _ => false,
        };
        if !allowed {
            tracing::debug!(path, ?precondition, "in-memory put rejected");
            return Ok(WriteOutcome::Conflict);
        }

        Ok(WriteOutcome::Committed(inner.commit(path, content)))
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<String>> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            validate_path(dir)?;
            format!("{dir}/")
        };
        let inner = self.read_inner()?;
        let names: BTreeSet<String> = inner
            .objects
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }

    fn locator(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("base_url", &self.base_url)
            .finish()
    }
}
