//! Flow items: an off-topic sentence is manufactured and planted in the
//! passage; the reader must find the sentence that breaks the flow.
//!
//! Chain: expand the passage once if it has fewer than five sentences →
//! pick the adjacent pair among the last three pairs with the most similar
//! lengths → extract each neighbor's topic word and the passage's main
//! idea → generate an off-topic sentence from the topic words → restyle it
//! to mimic its neighbors → insert it between them (index-tracked) → label
//! the last five sentences ①–⑤ → explain.

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::OPTION_LABELS;
use crate::text::template::render;

use super::{ensure_min_sentences, GeneratedItem};

const STEM: &str = "Which sentence does NOT fit the overall flow of the passage?";

const MIN_SENTENCES: usize = 5;

const TOPIC_WORD_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
What is the following sentence talking about? Answer by choosing one of the words used in the \
sentence. Do not choose a proper noun. Answer in one word, no punctuation, no capitalization.\n\
Sentence: {{s}}";

const MAIN_IDEA_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
What is the main idea of the passage? Write within a 15-word limit.\n\n{{p}}";

const OFF_TOPIC_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Write a sentence that includes the words \"{{r1}}\" and \"{{r2}}\" in that order, but that \
expresses an unrelated or off-topic idea compared to the following statement.\n\
Statement: {{main}}";

const REFINE_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Sentence 2 below will be planted between sentence 1 and sentence 3 in a question that asks \
which sentence breaks the flow of a passage. Keep sentence 2's message unchanged, but match \
its style to sentences 1 and 3 so it looks superficially natural, and start it with a \
connective adverb (Therefore, For example, In addition, In other words, or On the other hand) \
to add a surface-level trap. Output only the revised sentence 2.\n\n\
Sentence 1: {{s1}}\n\
Sentence 2: {{s2}}\n\
Sentence 3: {{s3}}";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
The answer to the flow question below is {{answer}}. In one sentence of the form \"The \
passage is about ..., so sentence {{answer}}, which ..., is unrelated to the overall flow.\", \
explain why that sentence breaks the flow.\n\n\
Question: Which sentence does NOT fit the overall flow of the passage?\n{{p}}";

/// Generates a flow item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let (working, sentences) = ensure_min_sentences(llm, passage, MIN_SENTENCES).await?;
    let n = sentences.len();

    // Candidate insertion slots: the last three adjacent pairs. The pair
    // with the most similar sentence lengths hides the plant best.
    let pairs = [(n - 2, n - 1), (n - 3, n - 2), (n - 4, n - 3)];
    let (left, right) = pairs
        .into_iter()
        .fold(None::<((usize, usize), usize)>, |best, (a, b)| {
            let diff = sentences[a]
                .chars()
                .count()
                .abs_diff(sentences[b].chars().count());
            match best {
                Some((_, best_diff)) if best_diff <= diff => best,
                _ => Some(((a, b), diff)),
            }
        })
        .map(|(pair, _)| pair)
        .unwrap_or((n - 2, n - 1));
    info!("planting between sentences {left} and {right}");

    let r1 = llm
        .complete(&render(TOPIC_WORD_PROMPT, &[("s", sentences[left].as_str())])?)
        .await?;
    let r2 = llm
        .complete(&render(TOPIC_WORD_PROMPT, &[("s", sentences[right].as_str())])?)
        .await?;
    let main_idea = llm
        .complete(&render(MAIN_IDEA_PROMPT, &[("p", &working)])?)
        .await?;

    let off_topic = llm
        .complete(&render(
            OFF_TOPIC_PROMPT,
            &[("r1", &r1), ("r2", &r2), ("main", &main_idea)],
        )?)
        .await?;
    let refined = llm
        .complete(&render(
            REFINE_PROMPT,
            &[
                ("s1", sentences[left].as_str()),
                ("s2", &off_topic),
                ("s3", sentences[right].as_str()),
            ],
        )?)
        .await?;

    // Insert by index; no re-finding of sentences by string equality.
    let mut final_sentences = sentences.clone();
    let planted_pos = left + 1;
    final_sentences.insert(planted_pos, refined);

    // Only the last five sentences carry labels; anything earlier is
    // unlabeled lead-in.
    let offset = final_sentences.len() - OPTION_LABELS.len();
    let answer_index = planted_pos.checked_sub(offset).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "planted sentence fell outside the labeled window"
        ))
    })?;
    let answer = OPTION_LABELS[answer_index].to_string();

    let labeled: Vec<String> = final_sentences
        .iter()
        .enumerate()
        .map(|(i, s)| match i.checked_sub(offset) {
            Some(label_index) => format!("{} {}", OPTION_LABELS[label_index], s),
            None => s.clone(),
        })
        .collect();
    let labeled_passage = labeled.join(" ");

    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("answer", answer.as_str()), ("p", &labeled_passage)],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{explanation_text}");

    let problem = format!("{STEM}\n\n{labeled_passage}");

    Ok(GeneratedItem::new(problem, answer, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[tokio::test]
    async fn test_flow_end_to_end() {
        // Sentences 4 and 5 have identical lengths, so the plant goes
        // between them.
        let passage = "Rivers shape the land over centuries. They carve valleys through rock. \
                       Sediment builds fertile plains downstream. Floods renew the soil there. \
                       Crops thrive on the deposits.";
        let planted = "In addition, canned soup keeps for years on shelves.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule_seq("talking about", &["soil", "deposits"])
            .rule("main idea of the passage", "Rivers build and renew fertile land.")
            .rule("unrelated or off-topic idea", "Canned soup keeps for years with soil and deposits.")
            .rule("Output only the revised sentence 2", planted)
            .rule("breaks the flow", "The passage is about rivers, so that sentence is unrelated to the overall flow.")
            .into_client();

        let item = generate(&llm, passage).await.unwrap();

        // Six sentences now; the last five are labeled.
        for label in OPTION_LABELS {
            assert!(item.problem.contains(label), "missing label {label}");
        }
        // The planted sentence carries the answer's label.
        assert!(item.problem.contains(&format!("{} {planted}", item.answer)));
        assert!(item.explanation.starts_with(&format!("Answer: {}", item.answer)));
    }

    #[tokio::test]
    async fn test_flow_short_passage_expands_once() {
        let expanded = "One grew. Two grew. Three grew taller. Four grew wider. Five grew best.";
        let (llm, backend) = ScriptedBackend::new()
            .rule("at least 5 complete English sentences", expanded)
            .rule_seq("talking about", &["taller", "wider"])
            .rule("main idea of the passage", "Things grow.")
            .rule("unrelated or off-topic idea", "Taller shelves hold wider boxes.")
            .rule("Output only the revised sentence 2", "In addition, taller shelves hold wider boxes.")
            .rule("breaks the flow", "The passage is about growth, so the shelf sentence is unrelated.")
            .into_client();

        let item = generate(&llm, "One grew. Two grew.").await.unwrap();
        assert_eq!(backend.calls_matching("at least 5 complete English sentences"), 1);
        assert!(OPTION_LABELS.contains(&item.answer.as_str()));
    }
}
