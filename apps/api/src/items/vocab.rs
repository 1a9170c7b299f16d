//! Vocabulary-in-context items: five sentences get one word underlined
//! each, one underlined word is swapped for its antonym, and the reader
//! must spot the swap.
//!
//! Chain: mark antonym-bearing adjectives in the five longest sentences →
//! fall back to verbs, then to the remaining sentences, then to forced
//! marking → verify part of speech and non-repetition per mark → corrupt
//! one random mark by antonym substitution → reassemble with ①–⑤.

use std::collections::BTreeMap;

use rand::Rng;
use regex::Regex;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::OPTION_LABELS;
use crate::text::segment::split_sentences;
use crate::text::template::render;

use super::GeneratedItem;

const STEM: &str = "Which underlined word is used inappropriately in its context?";

const REQUIRED_MARKS: usize = 5;

const ADJECTIVE_CHECK_PROMPT: &str = "Never respond in conversational form. Answer carefully \
after reading all the conditions below:\n\
If the following sentence contains an adjective that (1) is an adjective by part of speech and \
(2) has a clear antonym, output the whole sentence again with the adjective wrapped in angle \
brackets <>. If there is more than one such adjective, bracket each of them. If no such \
adjective appears in the sentence, output only: none.\n\
Sentence: {{s}}";

const VERB_CHECK_PROMPT: &str = "Never respond in conversational form. Answer carefully after \
reading all the conditions below:\n\
If the following sentence contains a verb that (1) is a verb by part of speech and (2) has a \
direct antonym representing an opposite action (for example: increase/decrease, gain/lose, \
accept/reject, win/lose), output the whole sentence again with the verb wrapped in angle \
brackets <>. If there is more than one such verb, bracket each of them. If no such verb \
appears in the sentence, output only: none.\n\
Sentence: {{s}}";

const VERIFY_POS_ADJECTIVE_PROMPT: &str = "Is the word bracketed with <> in the following \
sentence an adjective? Answer only with yes or no.\n\nSentence: {{s}}";

const VERIFY_POS_VERB_PROMPT: &str = "Is the word bracketed with <> in the following sentence \
a verb? Answer only with yes or no.\n\nSentence: {{s}}";

const VERIFY_DERIVATION_PROMPT: &str = "Does the bracketed word (including its derivational \
forms) appear twice or more in the sentence? Answer only with yes or no.\n\nSentence: {{s}}";

const FORCED_MARK_PROMPT: &str = "Never respond in conversational form. Answer carefully after \
reading all the conditions below:\n\
Pick one and only one word that has an antonym, and output the whole sentence again with the \
selected word wrapped in angle brackets <>.\n\
Sentence: {{s}}";

const CORRUPT_PROMPT: &str = "Never respond in conversational form. There is a sentence with \
one word bracketed with <>. The bracketed word has a clear antonym. Rewrite the sentence so \
that the bracketed word is replaced with its antonym, but the resulting sentence must still be \
grammatically well-formed. If the bracketed word is 'little' or 'few', delete the 'a' in front \
of it. Output the whole sentence again with the substitution bracketed just like the original.\n\
Sentence: {{s}}";

const EXPLAIN_PROMPT: &str = "Never respond in conversational form. Output only the result.\n\
In the altered sentence below, the bracketed word is wrong for its context and should be the \
bracketed word of the original sentence. Write a short explanation of why, in the form: \
\"The passage is about ... Therefore, the word should be replaced with a word like '...'\".\n\
Altered sentence: {{s}}\n\
Original sentence: {{original}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkSource {
    Adjective,
    Verb,
    Forced,
}

#[derive(Debug, Clone)]
struct MarkedSentence {
    text: String,
    source: MarkSource,
}

fn mark_pattern() -> Regex {
    Regex::new(r"<([^>]+)>").expect("mark pattern is valid")
}

fn is_yes(answer: &str) -> bool {
    answer.trim().trim_end_matches('.').eq_ignore_ascii_case("yes")
}

fn is_no(answer: &str) -> bool {
    answer.trim().trim_end_matches('.').eq_ignore_ascii_case("no")
}

/// Generates a vocabulary item. The passage must already contain at least
/// five sentences; vocabulary items never expand the passage.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let sentences = split_sentences(passage);
    if sentences.len() < REQUIRED_MARKS {
        return Err(AppError::Validation(
            "passage must contain at least five sentences".to_string(),
        ));
    }

    // The five longest sentences are marked first; the rest are fallback.
    let mut by_length: Vec<usize> = (0..sentences.len()).collect();
    by_length.sort_by(|a, b| {
        sentences[*b]
            .chars()
            .count()
            .cmp(&sentences[*a].chars().count())
    });
    let longest: Vec<usize> = by_length[..REQUIRED_MARKS].to_vec();
    let mut rest: Vec<usize> = by_length[REQUIRED_MARKS..].to_vec();
    rest.sort_unstable();

    let mut marked: BTreeMap<usize, MarkedSentence> = BTreeMap::new();

    try_marking(llm, &sentences, &longest, MarkSource::Adjective, &mut marked).await?;
    if marked.len() < REQUIRED_MARKS {
        try_marking(llm, &sentences, &longest, MarkSource::Verb, &mut marked).await?;
    }
    if marked.len() < REQUIRED_MARKS {
        try_marking(llm, &sentences, &rest, MarkSource::Adjective, &mut marked).await?;
    }
    if marked.len() < REQUIRED_MARKS {
        try_marking(llm, &sentences, &rest, MarkSource::Verb, &mut marked).await?;
    }

    if marked.len() < REQUIRED_MARKS {
        for index in &longest {
            if marked.contains_key(index) {
                continue;
            }
            let forced = llm
                .complete(&render(FORCED_MARK_PROMPT, &[("s", &sentences[*index])])?)
                .await?;
            if forced.contains('<') {
                marked.insert(
                    *index,
                    MarkedSentence {
                        text: forced,
                        source: MarkSource::Forced,
                    },
                );
            }
            if marked.len() >= REQUIRED_MARKS {
                break;
            }
        }
    }

    if marked.len() < REQUIRED_MARKS {
        return Err(AppError::NotFound(
            "could not mark five sentences with context-reversible words".to_string(),
        ));
    }

    // Corruption target: a random adjective mark, else a random verb mark.
    // Forced marks are never corrupted.
    let adjective_marked: Vec<usize> = marked
        .iter()
        .filter(|(_, m)| m.source == MarkSource::Adjective)
        .map(|(i, _)| *i)
        .collect();
    let verb_marked: Vec<usize> = marked
        .iter()
        .filter(|(_, m)| m.source == MarkSource::Verb)
        .map(|(i, _)| *i)
        .collect();

    let pool = if !adjective_marked.is_empty() {
        adjective_marked
    } else if !verb_marked.is_empty() {
        verb_marked
    } else {
        return Err(AppError::NotFound(
            "no adjective- or verb-marked sentence is available for corruption".to_string(),
        ));
    };
    let corrupt_index = pool[rand::thread_rng().gen_range(0..pool.len())];
    info!("corrupting sentence {corrupt_index}");

    let original = marked[&corrupt_index].clone();
    let corrupted = llm
        .complete(&render(CORRUPT_PROMPT, &[("s", &original.text)])?)
        .await?;

    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("s", &corrupted), ("original", &original.text)],
        )?)
        .await?;

    // Reassemble in sentence order, numbering marks ①–⑤ as they appear.
    let pattern = mark_pattern();
    let mut answer = String::new();
    let mut marker_index = 0usize;
    let mut assembled: Vec<String> = Vec::with_capacity(sentences.len());
    for (index, sentence) in sentences.iter().enumerate() {
        match marked.get(&index) {
            None => assembled.push(sentence.clone()),
            Some(mark) => {
                let applied = if index == corrupt_index {
                    corrupted.as_str()
                } else {
                    mark.text.as_str()
                };
                let label = OPTION_LABELS[marker_index];
                if index == corrupt_index {
                    answer = label.to_string();
                }
                marker_index += 1;
                assembled.push(pattern.replace(applied, format!("{label}<$1>")).into_owned());
            }
        }
    }
    let full_text = assembled.join(" ");

    let explanation = format!("Answer: {answer}\n{explanation_text}");
    let problem = format!("{STEM}\n\n{full_text}");

    Ok(GeneratedItem::new(problem, answer, explanation))
}

/// One marking pass over `indices` with the given source kind. Each
/// candidate mark is verified for part of speech and non-repetition before
/// it is accepted.
async fn try_marking(
    llm: &LlmClient,
    sentences: &[String],
    indices: &[usize],
    source: MarkSource,
    marked: &mut BTreeMap<usize, MarkedSentence>,
) -> Result<(), AppError> {
    let (check_prompt, verify_prompt) = match source {
        MarkSource::Adjective => (ADJECTIVE_CHECK_PROMPT, VERIFY_POS_ADJECTIVE_PROMPT),
        MarkSource::Verb => (VERB_CHECK_PROMPT, VERIFY_POS_VERB_PROMPT),
        MarkSource::Forced => return Ok(()),
    };
    let pattern = mark_pattern();

    for index in indices {
        if marked.contains_key(index) {
            continue;
        }
        let raw = llm
            .complete(&render(check_prompt, &[("s", &sentences[*index])])?)
            .await?;
        if raw.eq_ignore_ascii_case("none") || !raw.contains('<') {
            continue;
        }

        let clean = strip_close_conjunction_marks(&raw);
        let mut candidates: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(&clean) {
            let word = caps[1].trim().to_string();
            if !candidates.iter().any(|w| w.eq_ignore_ascii_case(&word)) {
                candidates.push(word);
            }
        }
        let already_marked: Vec<String> = marked
            .values()
            .filter_map(|m| {
                pattern
                    .captures(&m.text)
                    .map(|caps| caps[1].trim().to_lowercase())
            })
            .collect();
        candidates.retain(|w| !already_marked.contains(&w.to_lowercase()));
        candidates.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        for word in candidates {
            let single = pattern
                .replace_all(&clean, |caps: &regex::Captures| {
                    let w = caps[1].trim();
                    if w.eq_ignore_ascii_case(&word) {
                        format!("<{w}>")
                    } else {
                        w.to_string()
                    }
                })
                .into_owned();

            let pos_ok = llm
                .complete(&render(verify_prompt, &[("s", &single)])?)
                .await?;
            if !is_yes(&pos_ok) {
                continue;
            }

            let repeats = llm
                .complete(&render(VERIFY_DERIVATION_PROMPT, &[("s", &single)])?)
                .await?;
            if !is_no(&repeats) {
                continue;
            }

            marked.insert(
                *index,
                MarkedSentence {
                    text: single,
                    source,
                },
            );
            break;
        }

        if marked.len() >= REQUIRED_MARKS {
            return Ok(());
        }
    }
    Ok(())
}

/// Words too generic to make a fair vocabulary target.
const BANNED_MARK_WORDS: &[&str] = &[
    "good", "bad", "big", "hot", "cold", "old", "young", "happy", "sad", "new", "tall", "short",
    "clean", "dirty", "kind", "nice", "smart", "dumb",
];

/// Removes marks that sit next to a coordinating conjunction, carry a
/// hyphen, follow "a little"/"a few", or hit the banned-word list. A mark
/// in any of those positions makes the antonym swap detectable for the
/// wrong reason.
fn strip_close_conjunction_marks(sentence: &str) -> String {
    let trailing_punct = Regex::new(r"<([^>]+)>[.,!?]").expect("trailing punct pattern is valid");
    let normalized = trailing_punct.replace_all(sentence, "<$1>").into_owned();

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let full_mark = Regex::new(r"^<(.+)>$").expect("full mark pattern is valid");

    let context_of = |i: isize| -> Option<String> {
        if i < 0 {
            return None;
        }
        tokens
            .get(i as usize)
            .map(|t| t.to_lowercase().replace(&['.', ',', '!', '?'][..], ""))
    };

    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let Some(caps) = full_mark.captures(token) else {
            out.push(token.to_string());
            continue;
        };
        let inner = caps[1].to_string();
        let word = inner.to_lowercase();
        let idx = i as isize;
        let context = [
            context_of(idx - 2),
            context_of(idx - 1),
            context_of(idx + 1),
            context_of(idx + 2),
        ];

        let near_conjunction = context
            .iter()
            .flatten()
            .any(|t| t == "and" || t == "or");
        let little_few_with_a =
            (word == "little" || word == "few") && context_of(idx - 1).as_deref() == Some("a");
        let hyphen_attached = tokens
            .get(i + 1)
            .map(|t| t.starts_with('-'))
            .unwrap_or(false)
            || tokens
                .get(i.wrapping_sub(1))
                .map(|t| i > 0 && t.ends_with('-'))
                .unwrap_or(false);
        let banned = BANNED_MARK_WORDS.contains(&word.as_str());

        if near_conjunction || little_few_with_a || hyphen_attached || banned {
            out.push(inner);
        } else {
            out.push(token.to_string());
        }
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[test]
    fn test_strip_marks_near_conjunction() {
        let out = strip_close_conjunction_marks("It was <bright> and loud.");
        assert_eq!(out, "It was bright and loud.");
    }

    #[test]
    fn test_strip_marks_banned_word() {
        let out = strip_close_conjunction_marks("A <good> outcome followed.");
        assert_eq!(out, "A good outcome followed.");
    }

    #[test]
    fn test_strip_marks_a_few() {
        let out = strip_close_conjunction_marks("Only a <few> remained.");
        assert_eq!(out, "Only a few remained.");
    }

    #[test]
    fn test_strip_marks_keeps_clean_mark() {
        let out = strip_close_conjunction_marks("The sun was <bright> today.");
        assert_eq!(out, "The sun was <bright> today.");
    }

    #[test]
    fn test_strip_marks_drops_trailing_punctuation() {
        let out = strip_close_conjunction_marks("The sun was <bright>.");
        assert_eq!(out, "The sun was <bright>");
    }

    #[tokio::test]
    async fn test_vocab_requires_five_sentences() {
        let (llm, _backend) = ScriptedBackend::new().into_client();
        let result = generate(&llm, "One sentence. Two sentences.").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_vocab_end_to_end() {
        let passage = "The sun was bright. The sea looked calm. The horse was gentle. \
                       The knight was brave. The storm was fierce.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule("The sun was bright.", "The sun was <bright>.")
            .rule("The sea looked calm.", "The sea looked <calm>.")
            .rule("The horse was gentle.", "The horse was <gentle>.")
            .rule("The knight was brave.", "The knight was <brave>.")
            .rule("The storm was fierce.", "The storm was <fierce>.")
            .rule("Is the word bracketed", "yes")
            .rule("twice or more", "no")
            .rule("replaced with its antonym", "The sky was <dark>.")
            .rule("bracketed word is wrong", "The passage describes mild weather.")
            .into_client();

        let item = generate(&llm, passage).await.unwrap();

        // All five sentences got a numbered mark.
        for label in OPTION_LABELS {
            assert!(item.problem.contains(label), "missing label {label}");
        }
        // The corrupted sentence carries the answer's label.
        assert!(item.problem.contains(&format!("{}<dark>", item.answer)));
        assert!(item.explanation.starts_with(&format!("Answer: {}", item.answer)));
    }
}
