//! Numbered uploads on top of a versioned object store.
//!
//! Each accepted image becomes the next `NNN.<ext>` file in an entries
//! directory and gets one `filename|title` line in an append-only index.
//! The store offers no counters and no transactions, so the protocol is
//! built from its two conditional writes:
//!
//! - **Numbering**: the [`SequenceAllocator`] derives a *hint* from the
//!   directory listing or the index; the [`Uploader`] then create-only
//!   writes at the hint and walks forward past every taken number. Two
//!   submissions can start from the same hint; only one can create a given
//!   path.
//! - **Idempotency**: the [`IdempotencyGuard`] create-only writes a claim
//!   object derived from the client's token. A second claim for the same
//!   token conflicts and the submission is rejected as a duplicate.
//! - **Indexing**: the index is updated by read-append-compare-and-swap,
//!   restarted from scratch whenever another writer got in first.
//!
//! Both loops are bounded by a [`RetryPolicy`] and fail with their own
//! error kind when exhausted.
//!
//! # Modules
//!
//! - [`error`] -- [`UploadError`] and its client-facing [`ErrorKind`]
//! - [`entry`] -- extensions, filenames, title normalization
//! - [`index`] -- index line format
//! - [`allocator`] -- next-number hints
//! - [`guard`] -- idempotency claims
//! - [`uploader`] -- the end-to-end submission
//! - [`policy`] -- retry bounds, store layout, strategy selection

pub mod allocator;
pub mod entry;
pub mod error;
pub mod guard;
pub mod index;
pub mod policy;
pub mod uploader;

pub use allocator::{hint_from_index, hint_from_listing, HintStrategy, SequenceAllocator};
pub use entry::{format_filename, normalize_title, parse_entry_number, Entry, Extension, MAX_NUMBER};
pub use error::{ErrorKind, UploadError, UploadResult};
pub use guard::{claim_path, IdempotencyClaim, IdempotencyGuard};
pub use index::{append_record, parse_index, IndexRecord};
pub use policy::{RetryPolicy, StoreLayout, UploadPolicy};
pub use uploader::{Submission, UploadReceipt, Uploader};
