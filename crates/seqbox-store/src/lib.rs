//! Versioned, path-addressed object storage for seqbox.
//!
//! The store is the only coordination point between concurrent uploads. It
//! offers no transactions and no counters, only two conditional writes:
//!
//! - **create-only** ([`Precondition::CreateOnly`]) fails if the path is
//!   occupied; used to claim filenames and idempotency tokens.
//! - **compare-and-swap** ([`Precondition::Matches`]) replaces an object
//!   only if it still has the [`Version`] the writer last read; used for
//!   read-modify-write of the index.
//!
//! A failed precondition is a normal [`WriteOutcome::Conflict`], not an
//! error.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`LocalObjectStore`] -- files under a directory, single writer process
//! - [`GitHubStore`] -- one branch of a GitHub repository via the contents API

pub mod error;
pub mod github;
pub mod local;
pub mod memory;
pub mod object;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use github::{GitHubConfig, GitHubStore};
pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{join_path, validate_path, Precondition, Version, Versioned, WriteOutcome};
pub use traits::ObjectStore;
