//! Entries: numbered image files and their filename grammar.
//!
//! An entry's filename is its number zero-padded to [`NUMBER_WIDTH`]
//! digits, a dot, and an allow-listed extension, e.g. `007.webp`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{UploadError, UploadResult};
use crate::index::IndexRecord;

/// Digits in the external representation of an entry number.
pub const NUMBER_WIDTH: usize = 3;

/// Largest number representable in [`NUMBER_WIDTH`] digits.
pub const MAX_NUMBER: u32 = 999;

/// `NNN.ext` for an allow-listed extension, any case.
static ENTRY_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{3})\.(jpe?g|png|webp)$").expect("valid regex"));

/// Allow-listed image extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    Jpg,
    Jpeg,
    Png,
    Webp,
}

impl Extension {
    pub const ALL: [Extension; 4] = [Self::Jpg, Self::Jpeg, Self::Png, Self::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Normalize a client-supplied extension.
    ///
    /// Lower-cases the input and drops everything that is not an ASCII
    /// letter or digit (so `".PNG"` becomes `png`) before checking the
    /// allow-list.
    pub fn parse(raw: &str) -> UploadResult<Self> {
        let cleaned: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if cleaned.is_empty() {
            return Err(UploadError::BadRequest("missing file extension".into()));
        }
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str() == cleaned)
            .ok_or_else(|| UploadError::UnsupportedExtension(raw.to_string()))
    }
}

impl FromStr for Extension {
    type Err = UploadError;

    fn from_str(s: &str) -> UploadResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the filename for entry `number`.
pub fn format_filename(number: u32, extension: Extension) -> String {
    format!("{number:0width$}.{extension}", width = NUMBER_WIDTH)
}

/// Entry number of `name`, if it is a well-formed entry filename.
pub fn parse_entry_number(name: &str) -> Option<u32> {
    ENTRY_FILENAME
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Make a title safe for the line-oriented index.
///
/// Every run of CR/LF characters becomes one space, then the result is
/// trimmed.
pub fn normalize_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_break = false;
    for ch in raw.chars() {
        if ch == '\n' || ch == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out.trim().to_string()
}

/// A committed, numbered image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub number: u32,
    pub extension: Extension,
    pub title: String,
}

impl Entry {
    pub fn new(number: u32, extension: Extension, title: &str) -> Self {
        Self {
            number,
            extension,
            title: normalize_title(title),
        }
    }

    pub fn filename(&self) -> String {
        format_filename(self.number, self.extension)
    }

    pub fn index_record(&self) -> IndexRecord {
        IndexRecord::new(self.filename(), self.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_normalization() {
        assert_eq!(Extension::parse("PNG").unwrap(), Extension::Png);
        assert_eq!(Extension::parse(".JPEG").unwrap(), Extension::Jpeg);
        assert_eq!(" webp ".parse::<Extension>().unwrap(), Extension::Webp);
    }

    #[test]
    fn unsupported_extension() {
        let err = Extension::parse("bmp").unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedExtension(ref e) if e == "bmp"));
        assert!(matches!(Extension::parse("...").unwrap_err(), UploadError::BadRequest(_)));
    }

    #[test]
    fn filenames_are_zero_padded() {
        assert_eq!(format_filename(3, Extension::Jpg), "003.jpg");
        assert_eq!(format_filename(42, Extension::Webp), "042.webp");
        assert_eq!(format_filename(999, Extension::Png), "999.png");
    }

    #[test]
    fn entry_number_parsing() {
        assert_eq!(parse_entry_number("001.jpg"), Some(1));
        assert_eq!(parse_entry_number("120.JPEG"), Some(120));
        assert_eq!(parse_entry_number("999.webp"), Some(999));
        assert_eq!(parse_entry_number("photos.txt"), None);
        assert_eq!(parse_entry_number("01.jpg"), None);
        assert_eq!(parse_entry_number("1000.jpg"), None);
        assert_eq!(parse_entry_number("002.bmp"), None);
        assert_eq!(parse_entry_number("002.jpg.bak"), None);
    }

    #[test]
    fn title_normalization() {
        assert_eq!(normalize_title("  Sunset  "), "Sunset");
        assert_eq!(normalize_title("line one\r\nline two"), "line one line two");
        assert_eq!(normalize_title("a\n\n\nb"), "a b");
        assert_eq!(normalize_title("\ntrailing\n"), "trailing");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn entry_record() {
        let entry = Entry::new(3, Extension::Jpg, " Noon\n");
        assert_eq!(entry.filename(), "003.jpg");
        assert_eq!(entry.index_record().to_line(), "003.jpg|Noon");
    }
}
