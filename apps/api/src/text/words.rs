//! Word-level helpers: stop-word filtering and length ranking.

use std::collections::HashSet;

use regex::Regex;

/// Function words excluded when building the candidate keyword list.
const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "the", "in", "on", "at", "by", "for", "from", "of", "to", "with", "about", "is",
    "am", "are", "was", "were", "be", "being", "been", "do", "does", "did", "have", "has", "had",
    "can", "could", "will", "would", "shall", "should", "may", "might", "must", "and", "or", "but",
    "if", "because", "as", "while", "than", "so", "though", "although", "that", "which", "who",
    "whom", "whose",
];

/// Extracts the unique content words of a passage, lowercased, in first-
/// occurrence order, with function words removed.
pub fn content_words(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = FUNCTION_WORDS.iter().copied().collect();
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.is_empty() || stop.contains(word) {
            continue;
        }
        if seen.insert(word.to_string()) {
            words.push(word.to_string());
        }
    }
    words
}

/// The `count` longest unique alphabetic words of at least `min_len`
/// letters, lowercased, longest first. Ties keep first-occurrence order
/// (the sort is stable).
pub fn longest_unique_words(text: &str, min_len: usize, count: usize) -> Vec<String> {
    let word_pattern = Regex::new(r"[A-Za-z]+").expect("word pattern is valid");
    let lowered = text.to_lowercase();

    let mut seen = HashSet::new();
    let mut words: Vec<String> = word_pattern
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| seen.insert(w.clone()))
        .collect();

    words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    words.truncate(count);
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_words_filters_function_words() {
        let words = content_words("The cat sat on the mat, and it was warm.");
        assert_eq!(words, vec!["cat", "sat", "mat", "it", "warm"]);
    }

    #[test]
    fn test_content_words_unique_preserves_order() {
        let words = content_words("Tigers hunt. Tigers sleep.");
        assert_eq!(words, vec!["tigers", "hunt", "sleep"]);
    }

    #[test]
    fn test_longest_unique_words_ranked_by_length() {
        let words = longest_unique_words("a tiny hippopotamus chased an enormous bee", 4, 3);
        assert_eq!(words[0], "hippopotamus");
        assert_eq!(words[1], "enormous");
        assert_eq!(words[2], "chased");
    }

    #[test]
    fn test_longest_unique_words_respects_min_len() {
        let words = longest_unique_words("big cats eat mice", 4, 8);
        assert_eq!(words, vec!["cats", "mice"]);
    }
}
