//! Next-number hints.
//!
//! The allocator never reserves anything. It derives a starting candidate
//! from what the store currently shows; the uploader's create-only loop is
//! what actually makes numbers unique. Deriving the hint is kept as pure
//! functions over a listing or index text so the source can be swapped
//! without touching the write path.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use seqbox_store::ObjectStore;

use crate::entry::parse_entry_number;
use crate::error::{UploadError, UploadResult};
use crate::index::number_prefix;
use crate::policy::StoreLayout;

/// Where the allocator looks to find the highest used number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintStrategy {
    /// List the entries directory and parse entry filenames.
    #[default]
    DirectoryScan,
    /// Parse the numeric prefix of every index line.
    IndexParse,
}

/// One past the highest entry number among `names`; 1 if there is none.
pub fn hint_from_listing<I, S>(names: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| parse_entry_number(name.as_ref()))
        .max()
        .unwrap_or(0)
        + 1
}

/// One past the highest number prefix among the index lines; 1 if there is
/// none.
pub fn hint_from_index(text: &str) -> u32 {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let left = line.split_once('|').map_or(line, |(left, _)| left);
            number_prefix(left.trim())
        })
        .max()
        .unwrap_or(0)
        + 1
}

/// Read the index at `path` as text; a missing index reads as `None`.
pub(crate) async fn read_index(
    store: &dyn ObjectStore,
    path: &str,
) -> UploadResult<Option<(String, seqbox_store::Version)>> {
    let Some(current) = store.get(path).await? else {
        return Ok(None);
    };
    let text = String::from_utf8(current.content.to_vec()).map_err(|e| UploadError::CorruptIndex {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some((text, current.version)))
}

/// Computes the first candidate number for a new entry.
pub struct SequenceAllocator {
    store: Arc<dyn ObjectStore>,
    layout: StoreLayout,
    strategy: HintStrategy,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn ObjectStore>, layout: StoreLayout, strategy: HintStrategy) -> Self {
        Self {
            store,
            layout,
            strategy,
        }
    }

    pub fn strategy(&self) -> HintStrategy {
        self.strategy
    }

    /// Hint for the next entry number.
    ///
    /// A missing directory or index means "no entries yet" and yields 1.
    pub async fn next_number(&self) -> UploadResult<u32> {
        let hint = match self.strategy {
            HintStrategy::DirectoryScan => {
                let names = self.store.list(&self.layout.entries_dir).await?;
                hint_from_listing(&names)
            }
            HintStrategy::IndexParse => {
                match read_index(self.store.as_ref(), &self.layout.index_file).await? {
                    Some((text, _)) => hint_from_index(&text),
                    None => 1,
                }
            }
        };
        debug!(strategy = ?self.strategy, hint, "derived next-number hint");
        Ok(hint)
    }
}
