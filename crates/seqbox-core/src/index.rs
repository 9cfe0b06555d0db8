//! The append-only index: one `filename|title` line per entry.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed-width numeric prefix of an index line's filename segment.
static NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})(?:\D|$)").expect("valid regex"));

/// One line of the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub filename: String,
    pub title: String,
}

impl IndexRecord {
    pub fn new(filename: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            title: title.into(),
        }
    }

    /// `filename|title`, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}|{}", self.filename, self.title)
    }

    /// Parse one line. Blank lines yield `None`; a line without `|` is a
    /// filename with an empty title. Only the first `|` separates, so titles
    /// may contain `|`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            return None;
        }
        let (filename, title) = line.split_once('|').unwrap_or((line, ""));
        Some(Self::new(filename.trim(), title))
    }

    /// Entry number encoded in the filename, if it has a 3-digit prefix.
    pub fn number(&self) -> Option<u32> {
        number_prefix(&self.filename)
    }
}

/// Parse the 3-digit prefix of `segment`.
pub fn number_prefix(segment: &str) -> Option<u32> {
    NUMBER_PREFIX
        .captures(segment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse every non-blank line of an index.
pub fn parse_index(text: &str) -> Vec<IndexRecord> {
    text.lines().filter_map(IndexRecord::parse_line).collect()
}

/// Existing index text with `record` appended as a new line.
///
/// A final line missing its newline is terminated first so the new record
/// never merges into it.
pub fn append_record(existing: &str, record: &IndexRecord) -> String {
    let line = record.to_line();
    let mut out = String::with_capacity(existing.len() + line.len() + 2);
    out.push_str(existing);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&line);
    out.push('\n');
    out
}
