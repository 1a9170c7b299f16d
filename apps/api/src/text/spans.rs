//! Target-span resolution and blanking.
//!
//! A span chosen for blanking must be found in the passage before any
//! blanking occurs; the functions here return `Option` so callers surface
//! absence as a hard error instead of silently blanking nothing.

use regex::Regex;

/// The marker substituted for a blanked span in the full passage.
pub const BLANK_MARKER: &str = "<          >";

/// The marker substituted for a blanked span within a single sentence.
pub const SENTENCE_BLANK: &str = "[ ]";

/// Builds a case-insensitive whole-word pattern for a phrase, escaping any
/// regex metacharacters the phrase carries.
pub fn whole_word_pattern(phrase: &str) -> Regex {
    let escaped = regex::escape(phrase.trim());
    Regex::new(&format!(r"(?i)\b{escaped}\b")).expect("escaped phrase pattern is valid")
}

/// Returns the sentence in which `phrase` occurs last (by sentence index,
/// not string position) among all sentences containing it as a whole-word,
/// case-insensitive match. `None` when no sentence matches.
///
/// Resolution is idempotent: the same phrase against the same sentences
/// always yields the same index.
pub fn last_sentence_containing<'a>(
    sentences: &'a [String],
    phrase: &str,
) -> Option<(usize, &'a str)> {
    let pattern = whole_word_pattern(phrase);
    sentences
        .iter()
        .enumerate()
        .filter(|(_, text)| pattern.is_match(text))
        .map(|(index, text)| (index, text.as_str()))
        .last()
}

/// Replaces the first whole-word occurrence of `phrase` with `marker`,
/// case-insensitively. `None` when the phrase does not occur.
pub fn blank_first(text: &str, phrase: &str, marker: &str) -> Option<String> {
    let pattern = whole_word_pattern(phrase);
    if !pattern.is_match(text) {
        return None;
    }
    Some(pattern.replace(text, marker).into_owned())
}

/// Replaces every whole-word occurrence of `phrase` with `marker`.
/// `None` when the phrase does not occur.
pub fn blank_all(text: &str, phrase: &str, marker: &str) -> Option<String> {
    let pattern = whole_word_pattern(phrase);
    if !pattern.is_match(text) {
        return None;
    }
    Some(pattern.replace_all(text, marker).into_owned())
}

/// Wraps the first occurrence of `phrase` (case-insensitive, not word-
/// bounded: underline targets may carry internal punctuation) in `<...>`,
/// preserving the original casing of the matched text. Returns the marked
/// passage and the exact marked fragment.
pub fn underline_first(text: &str, phrase: &str) -> Option<(String, String)> {
    let escaped = regex::escape(phrase.trim());
    let pattern = Regex::new(&format!(r"(?i){escaped}")).expect("escaped phrase pattern is valid");
    let matched = pattern.find(text)?.as_str().to_string();
    let marked = format!("<{matched}>");
    let underlined = pattern.replace(text, marked.as_str()).into_owned();
    Some((underlined, marked))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_last_sentence_containing_picks_greatest_index() {
        let s = sentences(&["The cat sat.", "A dog ran.", "The cat slept."]);
        let (index, text) = last_sentence_containing(&s, "cat").unwrap();
        assert_eq!(index, 2);
        assert_eq!(text, "The cat slept.");
    }

    #[test]
    fn test_last_sentence_containing_is_idempotent() {
        let s = sentences(&["The cat sat.", "The cat slept."]);
        let first = last_sentence_containing(&s, "cat").unwrap();
        let second = last_sentence_containing(&s, "cat").unwrap();
        assert_eq!(first.0, second.0);
    }

    #[test]
    fn test_last_sentence_containing_is_whole_word() {
        let s = sentences(&["The cattle grazed."]);
        assert!(last_sentence_containing(&s, "cat").is_none());
    }

    #[test]
    fn test_last_sentence_containing_case_insensitive() {
        let s = sentences(&["Cats sleep.", "CATS dream."]);
        let (index, _) = last_sentence_containing(&s, "cats").unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_last_sentence_containing_escapes_metacharacters() {
        // Unescaped, "3.5" would also match "345"; escaped, it only
        // matches the literal text.
        let s = sentences(&["It cost 345 dollars.", "It cost 3.5 dollars."]);
        let (index, _) = last_sentence_containing(&s, "3.5 dollars").unwrap();
        assert_eq!(index, 1);
        assert!(last_sentence_containing(&s, "3+5 dollars").is_none());
    }

    #[test]
    fn test_blank_first_replaces_one_occurrence() {
        let blanked = blank_first("The cat saw a cat.", "cat", BLANK_MARKER).unwrap();
        assert_eq!(blanked, format!("The {BLANK_MARKER} saw a cat."));
    }

    #[test]
    fn test_blank_first_absent_phrase_is_none() {
        assert!(blank_first("Hello world.", "cat", BLANK_MARKER).is_none());
    }

    #[test]
    fn test_blank_marker_is_ten_spaces_wide() {
        assert_eq!(BLANK_MARKER.len(), 12);
        assert_eq!(&BLANK_MARKER[1..11], "          ");
    }

    #[test]
    fn test_blank_all_replaces_every_occurrence() {
        let blanked = blank_all("cat and cat", "cat", SENTENCE_BLANK).unwrap();
        assert_eq!(blanked, "[ ] and [ ]");
    }

    #[test]
    fn test_underline_first_preserves_casing() {
        let (underlined, marked) = underline_first("Break the Ice today.", "break the ice").unwrap();
        assert_eq!(marked, "<Break the Ice>");
        assert_eq!(underlined, "<Break the Ice> today.");
    }

    #[test]
    fn test_underline_first_absent_is_none() {
        assert!(underline_first("Hello.", "absent phrase").is_none());
    }
}
