//! Character-window helpers.
//!
//! Claim spans are byte offsets, but context windows are measured in
//! characters so that non-ASCII narratives slice on char boundaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Span;

/// A run of capitalized words: "Dining", "Home Depot".
pub static TITLE_CASE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*").expect("title-case pattern is valid")
});

/// Up to `chars` characters ending at byte offset `end`.
#[must_use]
pub fn window_before(text: &str, end: usize, chars: usize) -> &str {
    let end = floor_boundary(text, end);
    if chars == 0 {
        return "";
    }
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(0, |(i, _)| i);
    &head[start..]
}

/// Up to `chars` characters starting at byte offset `start`.
#[must_use]
pub fn window_after(text: &str, start: usize, chars: usize) -> &str {
    let start = floor_boundary(text, start);
    let tail = &text[start..];
    let end = tail.char_indices().nth(chars).map_or(tail.len(), |(i, _)| i);
    &tail[..end]
}

/// `chars` characters on each side of `span`, plus the span itself.
#[must_use]
pub fn window_around(text: &str, span: Span, chars: usize) -> &str {
    let before = window_before(text, span.start, chars);
    let after = window_after(text, span.end, chars);
    let start = span.start.min(text.len()) - before.len();
    let end = floor_boundary(text, span.end) + after.len();
    &text[start..end]
}

/// Whether `needle` occurs in `haystack` bounded by non-word characters.
#[must_use]
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        !haystack[..start].chars().next_back().is_some_and(is_word)
            && !haystack[end..].chars().next().is_some_and(is_word)
    })
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_word_needs_boundaries() {
        assert!(contains_word("Travel was 3x Groceries.", "Groceries"));
        assert!(contains_word("Kitchen Remodel, then more", "Kitchen Remodel"));
        assert!(!contains_word("Dinings were up", "Dining"));
        assert!(!contains_word("subtotals", "total"));
        assert!(!contains_word("anything", ""));
    }

    #[test]
    fn test_window_before_clamps() {
        assert_eq!(window_before("abcdef", 4, 2), "cd");
        assert_eq!(window_before("abcdef", 4, 10), "abcd");
        assert_eq!(window_before("abcdef", 4, 0), "");
    }

    #[test]
    fn test_window_after_clamps() {
        assert_eq!(window_after("abcdef", 2, 2), "cd");
        assert_eq!(window_after("abcdef", 2, 10), "cdef");
        assert_eq!(window_after("abcdef", 6, 3), "");
    }

    #[test]
    fn test_windows_count_chars_not_bytes() {
        let text = "café $5";
        let dollar = text.find('$').unwrap();
        assert_eq!(window_before(text, dollar, 2), "é ");
    }

    #[test]
    fn test_window_around() {
        let text = "You spent $50.00 on Dining";
        let span = Span::new(10, 16);
        assert_eq!(window_around(text, span, 4), "ent $50.00 on ");
    }

    #[test]
    fn test_title_case_runs() {
        let runs: Vec<_> = TITLE_CASE_RUN
            .find_iter("spent at Home Depot and Dining")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(runs, vec!["Home Depot", "Dining"]);
    }
}
