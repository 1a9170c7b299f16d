// Item orchestrators: one module per question type.
// Each orchestrator is a fixed, hand-written prompt chain: render a
// template, call the LLM client, feed the result into the next template,
// then assemble the final strings with the text utilities. There is no
// generic pipeline engine; the chains are short and the post-processing is
// where the correctness lives.

pub mod blank;
pub mod detail;
pub mod flow;
pub mod gist;
pub mod grammar;
pub mod handlers;
pub mod implication;
pub mod insertion;
pub mod ordering;
pub mod summary;
pub mod vocab;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::segment::split_sentences;
use crate::text::template::render;

/// Request body shared by every item endpoint.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    #[serde(alias = "passage")]
    pub text: String,
}

/// A finished item as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedItem {
    pub problem: String,
    pub answer: String,
    pub explanation: String,
    pub asterisked: Option<String>,
}

impl GeneratedItem {
    pub fn new(problem: String, answer: String, explanation: String) -> Self {
        Self {
            problem,
            answer,
            explanation,
            asterisked: None,
        }
    }
}

const EXPAND_PROMPT: &str = "You are part of an English question item development system. \
Never respond in conversational form. Output only the result.\n\n\
Add coherent, logically consistent, and stylistically similar content to the passage below \
so that it contains at least {{min}} complete English sentences. Keep the tone and topic \
consistent with the original. Output the resulting passage in one paragraph.\n\n{{p}}";

/// Ensures the passage has at least `min` sentences, invoking the expansion
/// prompt at most once. Returns the working passage and its sentences.
/// If the expanded passage still falls short the request fails; the
/// orchestrator must never index past the available sentence count.
pub(crate) async fn ensure_min_sentences(
    llm: &LlmClient,
    passage: &str,
    min: usize,
) -> Result<(String, Vec<String>), AppError> {
    let sentences = split_sentences(passage);
    if sentences.len() >= min {
        return Ok((passage.to_string(), sentences));
    }

    tracing::info!(
        "passage has {} sentences (< {min}); expanding once",
        sentences.len()
    );
    let expanded = llm
        .complete(&render(
            EXPAND_PROMPT,
            &[("p", passage), ("min", &min.to_string())],
        )?)
        .await?;

    let sentences = split_sentences(&expanded);
    if sentences.len() < min {
        return Err(AppError::NotFound(format!(
            "passage still has fewer than {min} sentences after one expansion"
        )));
    }
    Ok((expanded, sentences))
}
