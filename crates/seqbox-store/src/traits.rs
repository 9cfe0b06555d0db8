use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::object::{Precondition, Versioned, WriteOutcome};

/// Path-addressed, versioned object store.
///
/// This is the only coordination primitive seqbox relies on. Implementations
/// must satisfy these invariants:
/// - A [`Precondition::CreateOnly`] write to an occupied path never
///   succeeds, even when two writers race for the same path.
/// - A [`Precondition::Matches`] write succeeds only if the object still has
///   the given version, and then yields a new, different version.
/// - A missing object or directory is not an error.
/// - Precondition failures are reported as [`WriteOutcome::Conflict`];
///   every other failure is an `Err`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object and its current version.
    ///
    /// Returns `Ok(None)` if nothing exists at `path`.
    async fn get(&self, path: &str) -> StoreResult<Option<Versioned>>;

    /// Write `content` at `path` if `precondition` holds.
    async fn put(
        &self,
        path: &str,
        content: Bytes,
        precondition: Precondition,
    ) -> StoreResult<WriteOutcome>;

    /// Names of the immediate children of `dir`, sorted.
    ///
    /// A missing directory lists as empty. Pass `""` for the store root.
    async fn list(&self, dir: &str) -> StoreResult<Vec<String>>;

    /// Externally resolvable address of the object at `path`.
    fn locator(&self, path: &str) -> String;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.get(path).await?.is_some())
    }
}
