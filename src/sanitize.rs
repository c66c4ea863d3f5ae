//! Selection sanitizing
//!
//! Decides whether captured text is worth sending to the translator.
//! Rejection is not an error: the capture is simply dropped.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum selection length, in UTF-16 code units
pub const DEFAULT_MAX_CHARS: usize = 200;

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"(?i)(?:\b[a-z][a-z0-9+.\-]*://\S|\bwww\.\S)").expect("valid URL pattern")
    })
}

fn numeric_noise_pattern() -> &'static Regex {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    NOISE.get_or_init(|| Regex::new(r"^[.\s\d-]+$").expect("valid noise pattern"))
}

/// Validates and truncates captured selections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSanitizer {
    max_chars: usize,
}

impl Default for SelectionSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl SelectionSanitizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Return the text to send, or `None` when the selection should be ignored
    pub fn sanitize(&self, raw: Option<&str>) -> Option<String> {
        let text = truncate_utf16(raw?, self.max_chars);

        if text.is_empty()
            || text.starts_with('/')
            || url_pattern().is_match(text)
            || numeric_noise_pattern().is_match(text)
        {
            tracing::trace!("Selection rejected: {:?}", text);
            return None;
        }

        Some(text.to_string())
    }
}

/// Sanitize with the default length limit
pub fn sanitize(raw: Option<&str>) -> Option<String> {
    SelectionSanitizer::default().sanitize(raw)
}

/// Cut `text` to at most `max` UTF-16 code units without splitting a character
fn truncate_utf16(text: &str, max: usize) -> &str {
    let mut units = 0;
    for (index, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > max {
            return &text[..index];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_len(text: &str) -> usize {
        text.encode_utf16().count()
    }

    #[test]
    fn test_absent_and_empty_are_rejected() {
        assert_eq!(sanitize(None), None);
        assert_eq!(sanitize(Some("")), None);
    }

    #[test]
    fn test_paths_are_rejected() {
        assert_eq!(sanitize(Some("/path")), None);
        assert_eq!(sanitize(Some("/usr/share/dict/words")), None);
    }

    #[test]
    fn test_urls_are_rejected() {
        assert_eq!(sanitize(Some("https://example.com/page")), None);
        assert_eq!(sanitize(Some("see http://example.com for details")), None);
        assert_eq!(sanitize(Some("www.example.com")), None);
        assert_eq!(sanitize(Some("open file:///tmp/notes.txt")), None);
    }

    #[test]
    fn test_numeric_noise_is_rejected() {
        for noise in ["42", "3.14", "2024-01-05", "...", " - ", "1 2 3", "\t10.\n"] {
            assert_eq!(sanitize(Some(noise)), None, "{:?} should be rejected", noise);
        }
    }

    #[test]
    fn test_words_pass_through_unchanged() {
        assert_eq!(sanitize(Some("serendipity")), Some("serendipity".to_string()));
        assert_eq!(
            sanitize(Some("  take it with a grain of salt ")),
            Some("  take it with a grain of salt ".to_string())
        );
        assert_eq!(sanitize(Some("version 2")), Some("version 2".to_string()));
        assert_eq!(sanitize(Some("Straße")), Some("Straße".to_string()));
    }

    #[test]
    fn test_long_input_is_truncated_to_limit() {
        let long = "a".repeat(350);
        let result = sanitize(Some(&long)).unwrap();
        assert_eq!(utf16_len(&result), 200);
    }

    #[test]
    fn test_truncation_happens_before_checks() {
        // the URL only appears past the limit
        let text = format!("{} https://example.com", "word ".repeat(40));
        let result = sanitize(Some(&text)).unwrap();
        assert_eq!(utf16_len(&result), 200);
        assert!(!result.contains("https"));

        // digits followed by letters past the limit collapse to noise
        let text = format!("{}abc", "1".repeat(200));
        assert_eq!(sanitize(Some(&text)), None);
    }

    #[test]
    fn test_truncation_never_splits_surrogate_pairs() {
        let text = format!("{}😀tail", "b".repeat(199));
        let result = sanitize(Some(&text)).unwrap();
        assert_eq!(result, "b".repeat(199));
    }

    #[test]
    fn test_custom_limit() {
        let sanitizer = SelectionSanitizer::new(5);
        assert_eq!(sanitizer.sanitize(Some("abcdefgh")), Some("abcde".to_string()));
    }
}
