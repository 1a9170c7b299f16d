//! Implication items: a figurative phrase in the passage is underlined and
//! the reader must choose the expression that conveys its implied meaning.
//!
//! Chain: find a figurative phrase → underline it (it must occur in the
//! passage) → generate its implied meaning → verify the meaning fits the
//! phrase's grammatical slot → generate four distractors seeded with the
//! passage's longest content words → shuffle the options → explain.

use rand::thread_rng;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::{assemble_options, OrderPolicy};
use crate::text::segment::split_sentences;
use crate::text::spans::underline_first;
use crate::text::template::render;

use super::GeneratedItem;

const STEM: &str =
    "Which of the following best conveys the meaning of the underlined phrase?";

const FIND_PHRASE_PROMPT: &str = "You are part of an English question generation algorithm. \
Never respond in conversational form. Output only the result.\n\
Check whether the following passage has a phrase (only a noun phrase or a verb phrase of \
fewer than 20 words) that is symbolic or figurative, such that one cannot grasp its implied \
meaning without the help of the context. If so, output the phrase exactly as it appears. If \
not, output: none.\n\n\
Passage: {{p}}";

const IMPLIED_MEANING_PROMPT: &str = "You are part of an English question generation algorithm. \
Never respond in conversational form. Output only the result.\n\
What does the phrase marked with < > in the following passage figuratively mean? As an \
answer, provide a grammatically interchangeable expression: the parts of speech of the \
original phrase and of your answer must match.\n\n\
Passage: {{p}}";

const VALIDATE_FIT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Is the phrase \"{{m}}\" okay to put in the blank of the sentence grammatically? If so, say \
yes. If not, provide a revised version of \"{{m}}\" that fits the blank perfectly, and say no \
more than that.\n\n\
Sentence: {{b}}";

const DISTRACTOR_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Suggest a phrase that can be put in the blank of the following sentence using both \"{{ra}}\" \
and \"{{rb}}\". Make sure your suggestion is also similar in its length to \"{{c2}}\". If you \
cannot come up with one, it is okay to use only one of the two words.\n\n\
Make sure that when your suggestion is put in the blank, it creates a totally different \
meaning compared to when {{exclude}} is in it.\n\n\
Write in lowercase and do not use punctuation. Do not repeat the whole sentence; only output \
the part that fills the blank.\n\
Sentence: {{b}}";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Explain why the phrase marked with < > in the passage below means \"{{c2}}\". Base the \
explanation on the overall content of the passage; do not quote it directly. Use at most \
three sentences, ending with: \"Therefore, the underlined phrase most nearly means \
'{{c2}}'.\"\n\n\
Passage: {{p}}";

/// Generates an implication item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    // Step 1: find the figurative phrase.
    let c1 = llm
        .complete(&render(FIND_PHRASE_PROMPT, &[("p", passage)])?)
        .await?;
    if c1.eq_ignore_ascii_case("none") {
        return Err(AppError::NotFound(
            "the passage has no figurative phrase to underline".to_string(),
        ));
    }

    // Step 2: the phrase must occur in the passage before underlining.
    let (underlined, marked) = underline_first(passage, &c1).ok_or_else(|| {
        AppError::NotFound(format!(
            "figurative phrase '{c1}' does not occur in the passage"
        ))
    })?;
    info!("underlined phrase: {c1}");

    // Step 3: implied meaning.
    let implied = llm
        .complete(&render(IMPLIED_MEANING_PROMPT, &[("p", &underlined)])?)
        .await?;

    // Step 4: the sentence carrying the mark, blanked for slot validation.
    let blanked_sentence = split_sentences(&underlined)
        .into_iter()
        .find(|s| s.contains(&marked))
        .map(|s| s.replace(&marked, "< >"))
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "figurative phrase '{c1}' crosses a sentence boundary"
            ))
        })?;

    // Step 5: verify the implied meaning fits the slot; "yes" keeps it,
    // anything else is the judge's revision.
    let verdict = llm
        .complete(&render(
            VALIDATE_FIT_PROMPT,
            &[("m", &implied), ("b", &blanked_sentence)],
        )?)
        .await?;
    let c2 = if verdict.trim().trim_end_matches('.').eq_ignore_ascii_case("yes") {
        implied
    } else {
        verdict
    };

    // Step 6: distractors seeded with the longest content words, paired
    // outermost-in.
    let reference_words = crate::text::words::longest_unique_words(passage, 4, 8);
    if reference_words.len() < 8 {
        return Err(AppError::NotFound(
            "the passage does not contain eight distinct content words of four or more letters"
                .to_string(),
        ));
    }
    let mut distractors: Vec<String> = Vec::with_capacity(4);
    for round in 0..4 {
        let exclude = {
            let mut all: Vec<String> = vec![format!("'{c2}'")];
            all.extend(distractors.iter().map(|w| format!("'{w}'")));
            all.join(" or ")
        };
        let prompt = render(
            DISTRACTOR_PROMPT,
            &[
                ("ra", &reference_words[round]),
                ("rb", &reference_words[7 - round]),
                ("c2", &c2),
                ("exclude", &exclude),
                ("b", &blanked_sentence),
            ],
        )?;
        distractors.push(llm.complete(&prompt).await?);
    }

    // Step 7: implication options are shuffled, not length-sorted.
    let set = assemble_options(&c2, &distractors, OrderPolicy::Shuffle, &mut thread_rng())?;
    let answer = set.answer_label().to_string();

    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("p", &underlined), ("c2", set.options[set.answer_index].as_str())],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{explanation_text}");

    let problem = format!("{STEM}\n\n{underlined}\n\n{}", set.numbered_lines());

    Ok(GeneratedItem::new(problem, answer, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    const PASSAGE: &str = "Negotiations with the supplier dragged on for months without progress. \
        Management finally decided to break the ice with a small concession on delivery dates. \
        Both interesting sides quickly discovered common ground afterwards. Observers credited \
        the gesture with unlocking every subsequent agreement.";

    #[tokio::test]
    async fn test_implication_end_to_end() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("symbolic or figurative", "break the ice")
            .rule("figuratively mean", "ease the initial tension")
            .rule("okay to put in the blank", "yes")
            .rule_seq(
                "totally different",
                &[
                    "raise the delivery price",
                    "cancel the supplier contract",
                    "postpone common decisions",
                    "freeze subsequent agreements",
                ],
            )
            .rule("underlined phrase most nearly", "The supplier standoff ended after a goodwill gesture. Therefore, the underlined phrase most nearly means 'ease the initial tension'.")
            .into_client();

        let item = generate(&llm, PASSAGE).await.unwrap();

        // The phrase is underlined in the stem passage.
        assert!(item.problem.contains("<break the ice>"));

        // Wherever the shuffle put it, the answer label points at the
        // correct candidate.
        let answer_line = item
            .problem
            .lines()
            .find(|l| l.starts_with(item.answer.as_str()))
            .unwrap();
        assert!(answer_line.contains("ease the initial tension"));
        assert!(item.explanation.starts_with(&format!("Answer: {}", item.answer)));
    }

    #[tokio::test]
    async fn test_implication_phrase_absent_is_not_found() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("symbolic or figurative", "a phrase nobody wrote")
            .into_client();

        let result = generate(&llm, PASSAGE).await;
        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("does not occur")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_implication_no_phrase_is_not_found() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("symbolic or figurative", "none")
            .into_client();

        let result = generate(&llm, PASSAGE).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
