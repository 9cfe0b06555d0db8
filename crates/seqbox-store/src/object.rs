use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Opaque revision marker returned by a read and required to overwrite.
///
/// Backends choose the representation: a generation counter, a content
/// hash, or a remote blob SHA. Callers only compare and pass it back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Condition a write must satisfy to be committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// Fail if anything already exists at the path.
    CreateOnly,
    /// Replace the object only if its current version is exactly this one.
    Matches(Version),
}

impl Precondition {
    /// Precondition for overwriting what a previous read observed.
    ///
    /// `None` (the read found nothing) becomes [`Precondition::CreateOnly`].
    pub fn from_observed(version: Option<Version>) -> Self {
        match version {
            Some(v) => Self::Matches(v),
            None => Self::CreateOnly,
        }
    }
}

/// Content read from the store together with its current version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Versioned {
    pub content: Bytes,
    pub version: Version,
}

/// Result of a conditional write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied; the object now has this version.
    Committed(Version),
    /// The precondition did not hold; nothing was written.
    Conflict,
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Committed(v) => Some(v),
            Self::Conflict => None,
        }
    }
}

/// Check that `path` is a relative, slash-separated store path.
///
/// Rejects empty paths, leading or trailing slashes, empty components,
/// `.`/`..` components, and backslashes.
pub fn validate_path(path: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("path must not be empty"));
    }
    if path.contains('\\') {
        return Err(invalid("path must use '/' separators"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid("path must not start or end with '/'"));
    }
    for component in path.split('/') {
        match component {
            "" => return Err(invalid("path contains an empty component")),
            "." | ".." => return Err(invalid("path must not contain '.' or '..'")),
            _ => {}
        }
    }
    Ok(())
}

/// Join a directory and a name. An empty directory means the store root.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
