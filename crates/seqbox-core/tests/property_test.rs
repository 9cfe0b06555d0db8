//! Property-based tests for hint derivation and title normalization.

use proptest::prelude::*;
use seqbox_core::{
    append_record, format_filename, hint_from_index, hint_from_listing, normalize_title,
    parse_entry_number, parse_index, Extension, IndexRecord,
};

fn extension() -> impl Strategy<Value = Extension> {
    prop::sample::select(Extension::ALL.to_vec())
}

proptest! {
    /// Property: the listing hint is one past the largest entry number.
    #[test]
    fn prop_listing_hint_is_max_plus_one(
        entries in prop::collection::vec((1u32..=999, extension()), 0..40),
        noise in prop::collection::vec("[a-z]{1,8}\\.txt", 0..5),
    ) {
        let mut names: Vec<String> = entries
            .iter()
            .map(|(n, ext)| format_filename(*n, *ext))
            .collect();
        names.extend(noise);
        let expected = entries.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
        prop_assert_eq!(hint_from_listing(&names), expected);
    }

    /// Property: both hint sources agree on an index built from the same entries.
    #[test]
    fn prop_index_hint_matches_listing_hint(
        entries in prop::collection::vec((1u32..=999, extension(), "[ -{}~]{0,20}"), 0..30),
    ) {
        let mut text = String::new();
        let mut names = Vec::new();
        for (n, ext, title) in &entries {
            let filename = format_filename(*n, *ext);
            text = append_record(&text, &IndexRecord::new(filename.clone(), normalize_title(title)));
            names.push(filename);
        }
        prop_assert_eq!(hint_from_index(&text), hint_from_listing(&names));
        prop_assert_eq!(parse_index(&text).len(), entries.len());
    }

    /// Property: formatted filenames always parse back to their number.
    #[test]
    fn prop_filename_round_trip(n in 1u32..=999, ext in extension()) {
        prop_assert_eq!(parse_entry_number(&format_filename(n, ext)), Some(n));
    }

    /// Property: normalized titles are single trimmed lines and stable.
    #[test]
    fn prop_normalized_title_is_one_line(raw in "[a-z \\r\\n\\t]{0,64}") {
        let title = normalize_title(&raw);
        prop_assert!(!title.contains('\n'));
        prop_assert!(!title.contains('\r'));
        prop_assert_eq!(title.trim(), title.as_str());
        prop_assert_eq!(normalize_title(&title), title.clone());
    }
}
