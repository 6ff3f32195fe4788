//! Text normalization applied to every title and body before a record is built

use regex::Regex;
use std::sync::LazyLock;

/// Appended to text cut at its length limit
pub const TRUNCATION_MARKER: &str = " …";

/// Maximum title length, in characters
pub const TITLE_MAX_CHARS: usize = 300;

/// Maximum content length, in characters
pub const CONTENT_MAX_CHARS: usize = 5000;

// C0 and C1 control characters count as whitespace here.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s\x00-\x1F\x7F-\x9F]+").expect("noise pattern is valid")
});

/// Normalize text for storage.
///
/// Control characters become spaces, whitespace runs collapse to a single
/// space and the ends are trimmed. Text longer than `max_len` characters is
/// cut and suffixed with [`TRUNCATION_MARKER`] so that the result, marker
/// included, never exceeds `max_len` characters.
pub fn normalize(text: &str, max_len: usize) -> String {
    let collapsed = NOISE.replace_all(text, " ");
    let trimmed = collapsed.trim();

    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_len <= marker_len {
        return truncate_chars(trimmed, max_len).to_string();
    }

    let mut out = truncate_chars(trimmed, max_len - marker_len)
        .trim_end()
        .to_string();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// The first `max_chars` characters of `text`, cut on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace_and_controls() {
        let text = "  Hello\t\n\x00world\u{0085}  again\x7f ";
        assert_eq!(normalize(text, 100), "Hello world again");
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(normalize("", 10), "");
        assert_eq!(normalize(" \n\t\x01 ", 10), "");
    }

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(normalize("Décret n°2024", 300), "Décret n°2024");
    }

    #[test]
    fn test_truncation_respects_limit() {
        let text = "é".repeat(6000);
        let out = normalize(&text, CONTENT_MAX_CHARS);
        assert_eq!(out.chars().count(), CONTENT_MAX_CHARS);
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncation_does_not_leave_double_space() {
        let text = format!("{} {}", "a".repeat(7), "b".repeat(20));
        let out = normalize(&text, 10);
        assert_eq!(out, "aaaaaaa …");
    }

    #[test]
    fn test_tiny_limit() {
        assert_eq!(normalize("abcdef", 2), "ab");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("çàé", 2), "çà");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
