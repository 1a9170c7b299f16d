//! Sentence-insertion items: one sentence is lifted out of the passage,
//! the remaining sentences are shown with numbered positions, and the
//! reader must say where the given sentence belongs.
//!
//! The eligible-position computation is deterministic; the LLM is only
//! consulted for the explanation.

use rand::Rng;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::OPTION_LABELS;
use crate::text::segment::split_sentences;
use crate::text::template::render;

use super::GeneratedItem;

const STEM: &str = "Where does the given sentence best fit in the passage?";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
A sentence-insertion question lifts the sentence below out of the passage below. Write a \
short explanation of the cohesive clues (pronouns, connectives, repeated references) showing \
where the sentence belongs, without naming any option number.\n\n\
Lifted sentence: {{given}}\n\
Passage: {{p}}";

/// Indices whose removal yields a well-formed item: at least one sentence
/// precedes the insertion point, the answer lands on ①–⑤, and the
/// remaining passage still has five sentences to number. Empty below six
/// sentences.
///
/// The window skips up to four lead-in sentences on long passages so the
/// numbered region sits toward the end, mirroring how these items are set.
pub fn eligible_indices(len: usize) -> Vec<usize> {
    if len < 6 {
        return Vec::new();
    }
    let skip_front = (len - 5).min(4);
    let skip_back = len - 5 - skip_front;
    (skip_front..len - skip_back)
        .filter(|&i| (1..=4).contains(&i))
        .collect()
}

/// Generates an insertion item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let sentences = split_sentences(passage);
    let eligible = eligible_indices(sentences.len());
    if eligible.is_empty() {
        return Err(AppError::Validation(
            "passage must contain at least six sentences".to_string(),
        ));
    }

    let insert_index = eligible[rand::thread_rng().gen_range(0..eligible.len())];
    let given = &sentences[insert_index];
    let rest: Vec<&String> = sentences
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != insert_index)
        .map(|(_, s)| s)
        .collect();

    // Every sentence preceding the lifted one stays in the remainder, so
    // the lifted sentence belongs right before the remainder sentence at
    // its own index; `eligible_indices` keeps that on the label alphabet.
    let answer_index = insert_index;
    let answer = OPTION_LABELS[answer_index].to_string();

    let mut numbered: Vec<String> = Vec::with_capacity(rest.len());
    for (i, sentence) in rest.iter().enumerate() {
        if i < OPTION_LABELS.len() {
            numbered.push(format!("( {} ) {}", OPTION_LABELS[i], sentence));
        } else {
            numbered.push((*sentence).clone());
        }
    }

    let problem = format!("{STEM}\n\n{given}\n\n{}", numbered.join("\n"));

    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("given", given.as_str()), ("p", passage)],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{explanation_text}");

    Ok(GeneratedItem::new(problem, answer, explanation))
}
