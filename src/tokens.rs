//! Transcript tokenization
//!
//! Turns raw transcript text into lowercase word tokens so that casing and
//! punctuation added by the STT engine never affect keyword matching.

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z']+").expect("word pattern is valid"));

/// Split a transcript into normalized word tokens
///
/// The text is lowercased and every maximal run of ASCII letters or
/// apostrophes becomes a token. Digits, punctuation, whitespace and any
/// non-ASCII characters act as separators. Empty or symbol-only input
/// yields an empty vector.
pub fn classify(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_strips_punctuation_and_case() {
        assert_eq!(classify("STOP."), vec!["stop"]);
        assert_eq!(classify("Yeah, okay..."), vec!["yeah", "okay"]);
    }

    #[test]
    fn test_classify_empty_input() {
        assert!(classify("").is_empty());
        assert!(classify("   ").is_empty());
        assert!(classify("?!... 123 -- 42").is_empty());
    }

    #[test]
    fn test_classify_keeps_apostrophes() {
        assert_eq!(classify("Don't stop"), vec!["don't", "stop"]);
        assert_eq!(classify("'til"), vec!["'til"]);
    }

    #[test]
    fn test_classify_digits_split_words() {
        assert_eq!(classify("wait2go"), vec!["wait", "go"]);
    }

    #[test]
    fn test_classify_non_ascii_is_separator() {
        // "é" is not an ASCII letter, so "café" splits
        assert_eq!(classify("Café NO"), vec!["caf", "no"]);
    }

    #[test]
    fn test_classify_partial_words_stay_whole() {
        // "stopping" must not be reduced to "stop"
        assert_eq!(classify("stopping"), vec!["stopping"]);
    }
}
