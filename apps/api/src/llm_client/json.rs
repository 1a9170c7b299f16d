//! Tolerant JSON extraction from free-form model output.
//!
//! Models wrap JSON in markdown fences, quote it, or pad it with prose even
//! when told not to. Every structural parse of a completion goes through
//! `extract_json` so the cleanup lives in exactly one place and failures are
//! a `Result`, never a panic deep inside an orchestrator chain.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonExtractError {
    #[error("completion contains no JSON payload")]
    Missing,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| stripped.trim_start())
    } else {
        text
    }
}

/// Parses a JSON value out of a completion, tolerating code fences and
/// surrounding prose. If the fenced text does not parse as-is, the outermost
/// `{...}` or `[...]` slice is tried before giving up.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, JsonExtractError> {
    let cleaned = strip_fences(text);

    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let slice = outermost_json_slice(cleaned).ok_or(JsonExtractError::Parse(first_err))?;
            serde_json::from_str(slice).map_err(JsonExtractError::Parse)
        }
    }
}

fn outermost_json_slice(text: &str) -> Option<&str> {
    let object = slice_between(text, '{', '}');
    let array = slice_between(text, '[', ']');
    match (object, array) {
        (Some(o), Some(a)) => {
            // Prefer whichever opens first.
            if text.find('{') < text.find('[') {
                Some(o)
            } else {
                Some(a)
            }
        }
        (o, a) => o.or(a),
    }
}

fn slice_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
