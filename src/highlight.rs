use std::ops::Range;

use crate::models::Side;

/// Result of locating a marker inside a text.
///
/// `text` is always the untouched input; the highlight is carried as a byte
/// range so the text never accumulates annotations across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighted<'a> {
    pub text: &'a str,
    pub found: bool,
    pub anchor_id: Option<String>,
    span: Option<Range<usize>>,
}

impl<'a> Highlighted<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self {
            text,
            found: false,
            anchor_id: None,
            span: None,
        }
    }

    pub fn span(&self) -> Option<Range<usize>> {
        self.span.clone()
    }
}

/// Highlights the first occurrence of `marker` in `full_text`.
///
/// Matching is exact and case-sensitive. An empty marker never matches.
pub fn highlight<'a>(full_text: &'a str, marker: &str, anchor_id: &str) -> Highlighted<'a> {
    if marker.is_empty() {
        return Highlighted::plain(full_text);
    }
    match full_text.find(marker) {
        Some(start) => Highlighted {
            text: full_text,
            found: true,
            anchor_id: Some(anchor_id.to_string()),
            span: Some(start..start + marker.len()),
        },
        None => Highlighted::plain(full_text),
    }
}

pub fn anchor_id(side: Side, index: usize) -> String {
    format!("{}-marker-{}", side.anchor_prefix(), index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn marked<'a>(h: &Highlighted<'a>) -> Option<&'a str> {
        h.span().map(|span| &h.text[span])
    }

    #[rstest]
    #[case("The quick brown fox", "quick")]
    #[case("The quick brown fox", "The")]
    #[case("The quick brown fox", "fox")]
    #[case("con cáo nhanh nhảy qua", "nhảy qua")]
    #[case("line one\nline two", "one\nline")]
    fn found_marker_reassembles_to_original(#[case] text: &str, #[case] marker: &str) {
        let h = highlight(text, marker, "src-marker-0");
        assert!(h.found);
        assert_eq!(h.anchor_id.as_deref(), Some("src-marker-0"));
        assert_eq!(marked(&h), Some(marker));
        assert_eq!(h.text, text);
    }

    #[rstest]
    #[case("")]
    #[case("anything at all")]
    #[case("ÄÖÜ")]
    fn empty_marker_never_matches(#[case] text: &str) {
        let h = highlight(text, "", "src-marker-0");
        assert!(!h.found);
        assert_eq!(h.anchor_id, None);
        assert_eq!(h.text, text);
        assert_eq!(marked(&h), None);
    }

    #[test]
    fn missing_marker_leaves_text_unchanged() {
        let h = highlight("Hello world", "World", "tgt-marker-3");
        assert!(!h.found);
        assert_eq!(h.span(), None);
        assert_eq!(h.text, "Hello world");
    }

    #[test]
    fn only_first_occurrence_is_highlighted() {
        for index in 0..2 {
            let h = highlight("ABAB", "B", &anchor_id(Side::Source, index));
            assert_eq!(h.span(), Some(1..2));
        }
    }

    #[test]
    fn anchor_ids_are_per_side_and_index() {
        assert_eq!(anchor_id(Side::Source, 0), "src-marker-0");
        assert_eq!(anchor_id(Side::Target, 12), "tgt-marker-12");
    }
}
