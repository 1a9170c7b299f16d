//! Fill-in-the-blank items: a key word, phrase, or clause is removed from
//! the passage and the candidate answers compete for the blank.
//!
//! Chain: select target span → locate its last containing sentence →
//! generate the correct replacement → generate four distractors (each
//! prompt excludes everything generated so far) → assemble options by
//! length → explain.

use futures::future::join_all;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::{assemble_options, OrderPolicy};
use crate::text::segment::split_sentences;
use crate::text::spans::{blank_all, blank_first, last_sentence_containing, BLANK_MARKER, SENTENCE_BLANK};
use crate::text::template::render;
use crate::text::words::{content_words, longest_unique_words};

use super::GeneratedItem;

/// Which kind of span gets blanked. The three styles share one chain shape
/// and differ in span selection, distractor context, and reference words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankStyle {
    /// A single content word; distractors are validated against the blank.
    Word,
    /// A 2–6-word noun or verb phrase.
    Phrase,
    /// A 7–15-word verb phrase or subordinate clause; distractors are
    /// seeded with the passage's longest content words.
    Clause,
}

const STEM: &str = "Which of the following best fits in the blank?";

const SELECT_WORD_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
You are given a passage and a list of words that were extracted from the passage.\n\n\
From the list, select the single word that plays the most important semantic or contextual \
role in understanding the passage.\n\n\
Only select one word from the list. If no word from the list is considered important, output \"none\".\n\
Do not include punctuation. Write in lowercase.\n\n\
Passage: {{p}}\n\
Word list: {{words}}";

const SELECT_PHRASE_PROMPT: &str = "You are part of an English question item development system. \
Do not respond in conversational form.\n\n\
Find a contextually meaningful phrase in the following passage which consists of two to six \
words in one of the following grammatical categories: a noun phrase, or a verb phrase.\n\n\
Do not cross sentence boundaries; the selection must stay within a single sentence.\n\n\
Write your answer in lowercase and do not use any punctuation.\n\
Passage: {{p}}";

const SELECT_CLAUSE_PROMPT: &str = "You are part of an English question item development system. \
Do not respond in conversational form.\n\n\
Find a contextually meaningful phrase in the following passage which consists of seven to \
fifteen words in one of the following grammatical categories: a verb phrase, or a subordinate \
clause (not the whole sentence). Never choose a phrase that contains a comma.\n\n\
When you write your answer, do not include the initial subordinating conjunction, nor \"to\" \
in front of an infinitive.\n\n\
Write your answer in lowercase and do not use any punctuation.\n\
Passage: {{p}}";

const TRIM_VERB_THAT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Read the following phrase. If it begins with the combination of a verb + \"that\", output only \
the remaining phrase following the combination. If it does not begin with that pattern, output \
the phrase unchanged. All output should be in lowercase.\n\
Phrase: {{c1}}";

const WORD_REPLACEMENT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
I'd like to replace '{{c1}}' in the following passage with a word which was not used in the \
passage at all, but which completes the sentence both grammatically and semantically. \
Recommend one. Write in lowercase and do not use punctuation.\n\
Passage: {{p}}";

const PARAPHRASE_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
I'd like to paraphrase '{{c1}}' in the following passage with a new phrase of similar length. \
Recommend one that fits grammatically in place of '{{c1}}', but make sure your recommendation \
uses different words and structures. Write in lowercase and do not use punctuation.\n\
Passage: {{p}}";

const WORD_DISTRACTOR_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Name a single word that can be put in the blank of the following sentence, but that when put \
in it creates a totally different meaning compared to when {{exclude}} is in it.\n\
Write in lowercase and do not use punctuation.\n\
Sentence: {{b}}";

const PHRASE_DISTRACTOR_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Suggest a phrase that can be put in the blank of the following sentence, but that when put in \
it creates a totally different meaning compared to when {{exclude}} is in it. Make sure your \
suggestion is also similar in its length to '{{c2}}', but looks different on a superficial level.\n\
Write in lowercase and do not use punctuation.\n\
Sentence: {{b}}";

const CLAUSE_DISTRACTOR_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Suggest a phrase that can be put in the blank of the following sentence using both '{{ra}}' \
and '{{rb}}'. Make sure your suggestion is also similar in its length to '{{c2}}'. If you \
cannot come up with one, it is okay to use only one of the two words.\n\n\
Make sure that when your suggestion is put in the blank, it creates a totally different \
meaning compared to when {{exclude}} is in it.\n\n\
Write in lowercase and do not use punctuation. Do not repeat the whole sentence; only output \
the part that fills the blank.\n\
Sentence: {{b}}";

const VERIFY_DISTRACTOR_PROMPT: &str = "Evaluate whether the following word fits naturally in \
the blank of the given passage.\n\n\
Passage with blank:\n{{p}}\n\n\
Word: {{w}}\n\n\
If the word fits naturally and makes the sentence contextually appropriate, output a different \
word of similar length that does NOT fit naturally or correctly in this context.\n\
If the word does NOT fit naturally, just output \"no\".\n\n\
Only output one word or \"no\" with no punctuation or explanation.";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Write a short explanation of why the correct answer belongs in the blank of the following \
passage. Base the explanation on the overall argument of the passage or on the surrounding \
context; do not quote the passage directly. Use no more than three sentences, ending with: \
\"Therefore, the most appropriate expression for the blank is '{{c2}}'.\"\n\
Passage: {{p}}\n\
Correct answer: {{c2}}";

/// Generates a fill-in-the-blank item for the given style.
pub async fn generate(
    llm: &LlmClient,
    passage: &str,
    style: BlankStyle,
) -> Result<GeneratedItem, AppError> {
    let sentences = split_sentences(passage);

    // Step 1: select the target span.
    let c1 = select_span(llm, passage, style).await?;
    if c1.eq_ignore_ascii_case("none") {
        return Err(AppError::NotFound(
            "no key span could be selected from the passage".to_string(),
        ));
    }
    info!("selected target span: {c1}");

    // Step 2: the span must occur in the passage before any blanking.
    let (target_index, target_sentence) = last_sentence_containing(&sentences, &c1)
        .ok_or_else(|| {
            AppError::NotFound(format!("target span '{c1}' does not occur in the passage"))
        })?;
    info!("target sentence index: {target_index}");

    // Step 3: generate the correct replacement.
    let correct_prompt = match style {
        BlankStyle::Word => render(WORD_REPLACEMENT_PROMPT, &[("c1", &c1), ("p", passage)])?,
        BlankStyle::Phrase | BlankStyle::Clause => {
            render(PARAPHRASE_PROMPT, &[("c1", &c1), ("p", passage)])?
        }
    };
    let c2 = llm.complete(&correct_prompt).await?;

    // Step 4: blank the passage (first occurrence) for the stem, and pick
    // the distractor context: the whole blanked passage for Word, the
    // blanked target sentence for Phrase and Clause.
    let blanked_passage = blank_first(passage, &c1, BLANK_MARKER).ok_or_else(|| {
        AppError::NotFound(format!("target span '{c1}' does not occur in the passage"))
    })?;
    let distractor_context = match style {
        BlankStyle::Word => blanked_passage.clone(),
        BlankStyle::Phrase | BlankStyle::Clause => blank_all(target_sentence, &c1, SENTENCE_BLANK)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "target span '{c1}' does not occur in its own sentence"
                ))
            })?,
    };

    // Step 5: four distractors, each prompt excluding all earlier candidates.
    let distractors = generate_distractors(llm, passage, &distractor_context, &c1, &c2, style).await?;

    // Step 6: assemble and label.
    let set = assemble_options(&c2, &distractors, OrderPolicy::ByLength, &mut rand::thread_rng())?;
    let answer = set.answer_label().to_string();

    // Step 7: explanation, prefixed with the computed label.
    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("p", &blanked_passage), ("c2", set.options[set.answer_index].as_str())],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{explanation_text}");

    let problem = format!("{STEM}\n\n{blanked_passage}\n\n{}", set.numbered_lines());

    Ok(GeneratedItem::new(problem, answer, explanation))
}

async fn select_span(
    llm: &LlmClient,
    passage: &str,
    style: BlankStyle,
) -> Result<String, AppError> {
    match style {
        BlankStyle::Word => {
            let words = content_words(passage).join(", ");
            let prompt = render(SELECT_WORD_PROMPT, &[("p", passage), ("words", &words)])?;
            Ok(llm.complete(&prompt).await?)
        }
        BlankStyle::Phrase => {
            let prompt = render(SELECT_PHRASE_PROMPT, &[("p", passage)])?;
            Ok(llm.complete(&prompt).await?)
        }
        BlankStyle::Clause => {
            let raw = llm
                .complete(&render(SELECT_CLAUSE_PROMPT, &[("p", passage)])?)
                .await?;
            if raw.eq_ignore_ascii_case("none") {
                return Ok(raw);
            }
            // A leading "verb + that" would break whole-word matching of the
            // clause inside its sentence; a follow-up prompt strips it.
            let trimmed = llm
                .complete(&render(TRIM_VERB_THAT_PROMPT, &[("c1", &raw)])?)
                .await?;
            Ok(trimmed)
        }
    }
}

/// Renders an exclusion list: `'a' or 'b'`, `'a', 'b', or 'c'`.
fn exclusion_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => format!("'{only}'"),
        [head @ .., last] => {
            let quoted: Vec<String> = head.iter().map(|s| format!("'{s}'")).collect();
            format!("{}, or '{last}'", quoted.join(", "))
        }
    }
}

async fn generate_distractors(
    llm: &LlmClient,
    passage: &str,
    context: &str,
    c1: &str,
    c2: &str,
    style: BlankStyle,
) -> Result<Vec<String>, AppError> {
    // Clause distractors are seeded with the passage's eight longest
    // content words, paired outermost-in: (1st,8th), (2nd,7th), ...
    let reference_words = if style == BlankStyle::Clause {
        let words = longest_unique_words(passage, 4, 8);
        if words.len() < 8 {
            return Err(AppError::NotFound(
                "the passage does not contain eight distinct content words of four or more letters"
                    .to_string(),
            ));
        }
        Some(words)
    } else {
        None
    };

    let mut distractors: Vec<String> = Vec::with_capacity(4);
    for round in 0..4 {
        let exclude = {
            let mut all: Vec<&str> = vec![c1, c2];
            all.extend(distractors.iter().map(|s| s.as_str()));
            exclusion_list(&all)
        };
        let prompt = match (style, &reference_words) {
            (BlankStyle::Word, _) => render(
                WORD_DISTRACTOR_PROMPT,
                &[("b", context), ("exclude", &exclude)],
            )?,
            (BlankStyle::Phrase, _) => render(
                PHRASE_DISTRACTOR_PROMPT,
                &[("b", context), ("c2", c2), ("exclude", &exclude)],
            )?,
            (BlankStyle::Clause, Some(words)) => render(
                CLAUSE_DISTRACTOR_PROMPT,
                &[
                    ("b", context),
                    ("c2", c2),
                    ("exclude", &exclude),
                    ("ra", &words[round]),
                    ("rb", &words[7 - round]),
                ],
            )?,
            (BlankStyle::Clause, None) => unreachable!("reference words checked above"),
        };
        distractors.push(llm.complete(&prompt).await?);
    }

    // Word distractors are additionally validated against the blank; the
    // validations are independent of one another and run unordered.
    if style == BlankStyle::Word {
        let verified = join_all(distractors.iter().map(|word| {
            let llm = llm.clone();
            async move {
                let prompt = render(
                    VERIFY_DISTRACTOR_PROMPT,
                    &[("p", context), ("w", word.as_str())],
                )?;
                let judgment = llm.complete(&prompt).await?;
                // "no" means the distractor does not fit the blank, which
                // is what a distractor should do; anything else is the
                // judge's proposed replacement.
                Ok::<String, AppError>(if judgment.eq_ignore_ascii_case("no") {
                    word.clone()
                } else {
                    judgment
                })
            }
        }))
        .await;
        distractors = verified.into_iter().collect::<Result<Vec<_>, _>>()?;
    }

    Ok(distractors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[tokio::test]
    async fn test_blank_word_end_to_end() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("select the single word", "cat")
            .rule("not used in the passage at all", "dog")
            .rule_seq(
                "totally different meaning",
                &["rat", "elephant", "hippopotamus", "pen"],
            )
            .rule("fits naturally", "no")
            .rule("Write a short explanation", "The passage describes a resting animal.")
            .into_client();

        let item = generate(
            &llm,
            "The cat sat on the mat. It was warm and cozy.",
            BlankStyle::Word,
        )
        .await
        .unwrap();

        // The first occurrence of "cat" is replaced with the 10-space marker.
        assert!(item.problem.contains("The <          > sat on the mat."));

        // Five options, exactly one of which is the correct candidate.
        let option_lines: Vec<&str> = item
            .problem
            .lines()
            .filter(|l| l.starts_with(&['①', '②', '③', '④', '⑤'][..]))
            .collect();
        assert_eq!(option_lines.len(), 5);
        assert_eq!(
            option_lines.iter().filter(|l| l.ends_with(" dog")).count(),
            1
        );

        // Length sort is stable, so "dog" (inserted first among the
        // three-letter options) lands at ①.
        assert_eq!(item.answer, "①");
        assert!(option_lines[0].contains("dog"));
        assert!(item.explanation.starts_with("Answer: ①\n"));
    }

    #[tokio::test]
    async fn test_blank_word_missing_span_is_not_found() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("select the single word", "cat")
            .into_client();

        let result = generate(&llm, "Hello world.", BlankStyle::Word).await;
        match result {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("cat")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_word_rejects_none_selection() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("select the single word", "none")
            .into_client();

        let result = generate(&llm, "Hello world.", BlankStyle::Word).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_phrase_blanks_target_sentence_for_distractors() {
        let (llm, backend) = ScriptedBackend::new()
            .rule("two to six", "sat on the mat")
            .rule("paraphrase", "rested upon the rug")
            .rule_seq(
                "totally different meaning",
                &["ran in circles", "ate its dinner slowly", "ignored the visitors", "chased a toy"],
            )
            .rule("Write a short explanation", "The cat was at rest.")
            .into_client();

        let item = generate(
            &llm,
            "The cat sat on the mat. It was warm and cozy.",
            BlankStyle::Phrase,
        )
        .await
        .unwrap();

        assert!(item.problem.contains(BLANK_MARKER));
        // Distractor prompts receive the blanked sentence, not the passage.
        assert!(backend.calls_matching("The cat [ ].") >= 1);
        let set_line = item
            .problem
            .lines()
            .find(|l| l.contains("rested upon the rug"))
            .expect("correct option present");
        assert!(set_line.starts_with(item.answer.as_str()));
    }

    #[test]
    fn test_exclusion_list_formats() {
        assert_eq!(exclusion_list(&["a"]), "'a'");
        assert_eq!(exclusion_list(&["a", "b"]), "'a', or 'b'");
        assert_eq!(exclusion_list(&["a", "b", "c"]), "'a', 'b', or 'c'");
    }
}
