//! Detail-mismatch items: five factual statements are drawn from the
//! passage in order, one is distorted, and the reader must find the one
//! that does not agree with the passage.
//!
//! Chain: split off the footnote → expand the passage once if it has fewer
//! than five sentences → summarize the facts of the five longest sentences
//! (unordered batch) → distort one at random → explain by quoting the
//! original sentence.

use futures::future::join_all;
use rand::Rng;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::OPTION_LABELS;
use crate::text::segment::split_footnote;
use crate::text::template::render;

use super::{ensure_min_sentences, GeneratedItem};

const MIN_SENTENCES: usize = 5;

const EXTRACT_FACT_PROMPT: &str = "You are part of an English question item development system. \
Never respond in conversational form. Output only the result.\n\
Restate the factual information of the sentence below as one English sentence of at most 20 \
words. The meaning must stay the same, but the wording and sentence structure must differ \
from the original. No numbering, no extra text.\n\n\
Sentence: {{s}}";

const DISTORT_FACT_PROMPT: &str = "You are part of an English question item development system. \
Never respond in conversational form. Output only the result.\n\
The statement below is a faithful restatement of information in the passage. Rewrite it so \
that it contradicts the passage in one specific detail while keeping its form and length. \
Output only the rewritten statement.\n\n\
Statement: {{f}}\n\
Passage: {{p}}";

const EXTRACT_TOPIC_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Name the subject of the passage below in two to five words, suitable for the phrase \
\"about ...\". No final period.\n\n\
Passage: {{p}}";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
A detail question asks which statement does not agree with the passage; the wrong statement \
and the passage sentence it contradicts are given below. In one sentence, state what the \
passage actually says and how the statement departs from it.\n\n\
Wrong statement: {{o}}\n\
Passage sentence: {{s}}";

/// Generates a detail-mismatch item. The footnote, when present, is carried
/// in the response's `asterisked` field.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let (body, asterisked) = split_footnote(passage);
    let (working, sentences) = ensure_min_sentences(llm, &body, MIN_SENTENCES).await?;

    // Prompts see the footnote so glossary terms stay resolvable.
    let prompt_passage = match &asterisked {
        Some(note) => format!("{working}\n{note}"),
        None => working.clone(),
    };

    // The five longest sentences, restored to passage order.
    let mut by_length: Vec<usize> = (0..sentences.len()).collect();
    by_length.sort_by(|a, b| {
        sentences[*b]
            .chars()
            .count()
            .cmp(&sentences[*a].chars().count())
    });
    let mut selected: Vec<usize> = by_length[..MIN_SENTENCES].to_vec();
    selected.sort_unstable();

    // Fact extraction per sentence is independent and runs unordered.
    let fact_results = join_all(selected.iter().map(|index| {
        let llm = llm.clone();
        let sentence = sentences[*index].clone();
        async move {
            let prompt = render(EXTRACT_FACT_PROMPT, &[("s", sentence.as_str())])?;
            llm.complete(&prompt).await.map_err(AppError::from)
        }
    }))
    .await;
    let facts: Vec<String> = fact_results.into_iter().collect::<Result<_, _>>()?;

    let wrong_pos = rand::thread_rng().gen_range(0..facts.len());
    info!("distorting fact {wrong_pos}");
    let distorted = llm
        .complete(&render(
            DISTORT_FACT_PROMPT,
            &[("f", facts[wrong_pos].as_str()), ("p", &prompt_passage)],
        )?)
        .await?;

    let topic = llm
        .complete(&render(EXTRACT_TOPIC_PROMPT, &[("p", &prompt_passage)])?)
        .await?;

    let answer = OPTION_LABELS[wrong_pos].to_string();
    let original_sentence = &sentences[selected[wrong_pos]];
    let reason = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("o", distorted.as_str()), ("s", original_sentence.as_str())],
        )?)
        .await?;
    let explanation = format!(
        "Answer: {answer}\n{reason} The passage states \"{original_sentence}\", so {answer} does \
         not agree with the passage."
    );

    let choice_lines = facts
        .iter()
        .enumerate()
        .map(|(i, fact)| {
            let text = if i == wrong_pos { &distorted } else { fact };
            format!("{} {}", OPTION_LABELS[i], text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let stem = format!("Which of the following does NOT agree with the passage about {topic}?");
    let problem = format!("{stem}\n\n{prompt_passage}\n\n{choice_lines}");

    let mut item = GeneratedItem::new(problem, answer, explanation);
    item.asterisked = asterisked;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[tokio::test]
    async fn test_detail_end_to_end_with_footnote() {
        let passage = "The gavial lives in rivers. It eats mostly fish. Its snout is long \
                       and thin. Adults can pass four meters. The species is critically \
                       endangered. *gavial: a crocodilian of South Asia";
        let (llm, _backend) = ScriptedBackend::new()
            .rule_seq(
                "Restate the factual information",
                &[
                    "Rivers are the gavial's home.",
                    "Fish make up most of its diet.",
                    "The snout is slender and elongated.",
                    "Grown ones exceed four meters.",
                    "It faces a critical risk of extinction.",
                ],
            )
            .rule("contradicts the passage", "It faces no risk of extinction at all.")
            .rule("suitable for the phrase", "the gavial")
            .rule("departs from it", "The passage calls the species critically endangered.")
            .into_client();

        let item = generate(&llm, passage).await.unwrap();

        assert_eq!(item.asterisked.as_deref(), Some("*gavial: a crocodilian of South Asia"));
        assert!(item.problem.contains("about the gavial"));

        // Exactly one option was distorted, and it carries the answer label.
        let distorted_line = item
            .problem
            .lines()
            .find(|l| l.contains("no risk of extinction"))
            .unwrap();
        assert!(distorted_line.starts_with(item.answer.as_str()));
        assert!(item.explanation.starts_with(&format!("Answer: {}", item.answer)));
        assert!(item.explanation.contains("The passage states"));
    }

    #[tokio::test]
    async fn test_detail_short_passage_expands_once_then_fails() {
        let (llm, backend) = ScriptedBackend::new()
            .rule("at least 5 complete English sentences", "Still too short. Really.")
            .into_client();

        let result = generate(&llm, "One. Two.").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(backend.calls_matching("at least 5 complete English sentences"), 1);
    }
}
