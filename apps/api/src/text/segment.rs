//! Sentence segmentation and footnote handling.

use regex::Regex;

fn sentence_pattern() -> Regex {
    Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern is valid")
}

fn footnote_pattern() -> Regex {
    Regex::new(r"(?s)^(.*?)(\*.+)$").expect("footnote pattern is valid")
}

/// Splits a passage into trimmed sentences bounded by terminal punctuation.
///
/// Known limitation: abbreviations and decimal points over-split ("Dr. Kim"
/// becomes two sentences). The downstream consumers are LLM prompts that
/// tolerate minor mis-segmentation, so this is accepted lossy behavior.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.replace(&['\r', '\n'][..], " ");
    sentence_pattern()
        .find_iter(&normalized)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Splits off a trailing footnote segment introduced by `*`.
/// Returns the passage body and the footnote, both trimmed.
/// The footnote must be restored only in final output, never fed to the
/// sentence splitter.
pub fn split_footnote(passage: &str) -> (String, Option<String>) {
    match footnote_pattern().captures(passage) {
        Some(caps) => (
            caps[1].trim().to_string(),
            Some(caps[2].trim().to_string()),
        ),
        None => (passage.trim().to_string(), None),
    }
}
