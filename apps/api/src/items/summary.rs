//! Summary-completion items: the passage is condensed into one sentence
//! with two key words blanked as (A) and (B); the options are word pairs.
//!
//! Chain: generate a tagged one-sentence summary (`@word` marks the (A)
//! word, `#word` marks the (B) word) → batch-generate four wrong pairs →
//! order the pairs by combined length → explain, substituting the marked
//! words back with their blanks.

use rand::thread_rng;
use regex::Regex;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError};
use crate::text::options::{assemble_options, OrderPolicy, OPTION_LABELS};
use crate::text::template::render;

use super::GeneratedItem;

const STEM: &str =
    "The passage is to be summarized in one sentence. Which pair best completes blanks (A) and (B)?";

const SUMMARY_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Summarize the following passage in exactly one English sentence. Choose the two words that \
carry the most weight in your summary: prefix the first with @ and the second with # (for \
example: \"Honesty @builds trust and #strengthens friendships.\"). Mark exactly one word with \
each symbol.\n\n\
Passage: {{p}}";

const WRONG_PAIRS_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
A summary-completion question uses the passage and the blanked summary below. The correct \
pair for blanks (A) and (B) is: {{c}}.\n\n\
Produce four wrong pairs. Each pair must fit the blanks grammatically but distort the meaning \
of the passage. Output exactly four lines, each of the form: word, word. No numbering, no \
extra text.\n\n\
Passage: {{p}}\n\
Blanked summary: {{s}}";

const EXPLAIN_MAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
In one or two sentences, state what the passage below is about, as grounds for a summary whose \
key pair is {{c}}. Do not quote the passage directly.\n\n\
Passage: {{p}}\n\
Blanked summary: {{s}}";

const EXPLAIN_SUMMARY_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Rewrite the tagged summary below as a plain sentence, wrapping the word tagged with @ in $ \
signs and the word tagged with # in % signs (for example: \"Honesty $builds$ trust and \
%strengthens% friendships.\"). Change nothing else.\n\n\
Tagged summary: {{s}}";

const DEFINE_WRONGS_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Give a two-to-four-word gloss for each of the following eight words, in order, separated by \
commas only: {{words}}";

fn tag_pattern() -> Regex {
    Regex::new(r"[@#]([^\s.,!]+)").expect("tag pattern is valid")
}

/// Generates a summary-completion item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    // Step 1: tagged summary.
    let s1 = llm
        .complete(&render(SUMMARY_PROMPT, &[("p", passage)])?)
        .await?;

    let tags: Vec<String> = tag_pattern()
        .captures_iter(&s1)
        .map(|caps| caps[1].trim().to_string())
        .collect();
    if tags.len() < 2 {
        return Err(AppError::NotFound(
            "the summary did not mark two key words".to_string(),
        ));
    }
    let (c1, c2) = (&tags[0], &tags[1]);
    let correct_pair = format!("{c1}, {c2}");
    info!("summary key pair: {correct_pair}");

    let at_word = Regex::new(r"@[^\s.,!]+").expect("at-tag pattern is valid");
    let hash_word = Regex::new(r"#[^\s.,!]+").expect("hash-tag pattern is valid");
    let s2 = hash_word
        .replace_all(&at_word.replace_all(&s1, "(A)"), "(B)")
        .into_owned();

    // Step 2: four wrong pairs from one batch prompt, one per line.
    let wrong_raw = llm
        .complete(&render(
            WRONG_PAIRS_PROMPT,
            &[("p", passage), ("s", &s2), ("c", &correct_pair)],
        )?)
        .await?;
    let wrong_pairs = parse_wrong_pairs(&wrong_raw)?;

    // Step 3: options are the joined pairs, ordered by combined length.
    let distractors: Vec<String> = wrong_pairs
        .iter()
        .map(|(a, b)| format!("{a}, {b}"))
        .collect();
    let set = assemble_options(
        &correct_pair,
        &distractors,
        OrderPolicy::ByLength,
        &mut thread_rng(),
    )?;
    let answer = set.answer_label().to_string();

    // Step 4: explanation from three further prompts.
    let e1 = llm
        .complete(&render(
            EXPLAIN_MAIN_PROMPT,
            &[("p", passage), ("s", &s2), ("c", &correct_pair)],
        )?)
        .await?;

    let e2_raw = llm
        .complete(&render(EXPLAIN_SUMMARY_PROMPT, &[("s", &s1)])?)
        .await?;
    let dollar = Regex::new(r"\$(.*?)\$").expect("dollar pattern is valid");
    let percent = Regex::new(r"%(.*?)%").expect("percent pattern is valid");
    let e2 = percent
        .replace_all(
            &dollar.replace_all(&e2_raw, format!("(A)$1({c1})")),
            format!("(B)$1({c2})"),
        )
        .into_owned();

    let wrong_words: Vec<&str> = wrong_pairs
        .iter()
        .flat_map(|(a, b)| [a.as_str(), b.as_str()])
        .collect();
    let e3 = llm
        .complete(&render(
            DEFINE_WRONGS_PROMPT,
            &[("words", &wrong_words.join(", "))],
        )?)
        .await?;
    let glosses: Vec<String> = e3.split(',').map(|d| d.trim().to_string()).collect();
    if glosses.len() < wrong_words.len() {
        return Err(AppError::Llm(LlmError::Unusable(format!(
            "expected {} glosses, got {}",
            wrong_words.len(),
            glosses.len()
        ))));
    }
    let wrong_list = wrong_words
        .iter()
        .zip(&glosses)
        .map(|(word, gloss)| format!("{word}({gloss})"))
        .collect::<Vec<_>>()
        .join(", ");

    let explanation = format!(
        "Answer: {answer}\n{e1} The summary should therefore read '{e2}'. [Wrong options] {wrong_list}"
    );

    // Step 5: problem text with the two-column option block.
    let blanked_summary = s2.replace("(A)", "___(A)___").replace("(B)", "___(B)___");
    let header = "     (A)          (B)";
    let choice_lines = set
        .options
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let (a, b) = pair.split_once(',').unwrap_or((pair.as_str(), ""));
            format!("{} {}\u{2026}\u{2026}{}", OPTION_LABELS[i], a.trim(), b.trim())
        })
        .collect::<Vec<_>>()
        .join("\n");

    let problem = format!(
        "{STEM}\n\n{}\n\nSummary:\n{blanked_summary}\n\n{header}\n{choice_lines}",
        passage.trim()
    );

    Ok(GeneratedItem::new(problem, answer, explanation))
}

/// Parses four comma-separated word pairs, one per line.
fn parse_wrong_pairs(raw: &str) -> Result<Vec<(String, String)>, AppError> {
    let pairs: Vec<(String, String)> = raw
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .take(4)
        .filter_map(|line| {
            line.split_once(',')
                .map(|(a, b)| (a.trim().to_string(), b.trim().to_string()))
        })
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
        .collect();
    if pairs.len() < 4 {
        return Err(AppError::Llm(LlmError::Unusable(format!(
            "expected four wrong pairs, got {}",
            pairs.len()
        ))));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[test]
    fn test_parse_wrong_pairs_happy_path() {
        let pairs =
            parse_wrong_pairs("breaks, weakens\nhides, delays\nignores, divides\nsells, buys")
                .unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], ("breaks".to_string(), "weakens".to_string()));
    }

    #[test]
    fn test_parse_wrong_pairs_rejects_short_output() {
        assert!(parse_wrong_pairs("only, one").is_err());
        assert!(parse_wrong_pairs("no pairs at all").is_err());
    }

    #[tokio::test]
    async fn test_summary_end_to_end() {
        let passage = "Honesty builds trust between people. Friends who tell the truth \
                       stay close. Small lies slowly weaken any friendship.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule(
                "prefix the first with @",
                "Honesty @builds trust and #strengthens friendships.",
            )
            .rule(
                "four wrong pairs",
                "breaks, weakens\nhides, delays\nignores, divides\nsells, buys",
            )
            .rule("as grounds for a summary", "The passage argues that truthfulness sustains friendship.")
            .rule(
                "wrapping the word tagged with @",
                "Honesty $builds$ trust and %strengthens% friendships.",
            )
            .rule(
                "two-to-four-word gloss",
                "to destroy, to make weaker, to conceal, to postpone, to disregard, to split apart, to exchange for money, to purchase",
            )
            .into_client();

        let item = generate(&llm, passage).await.unwrap();

        // The summary line shows both blanks.
        assert!(item.problem.contains("___(A)___"));
        assert!(item.problem.contains("___(B)___"));

        // Five pair options, answer label tracks the correct pair.
        let answer_index = OPTION_LABELS
            .iter()
            .position(|l| *l == item.answer)
            .unwrap();
        let option_line = item
            .problem
            .lines()
            .find(|l| l.starts_with(OPTION_LABELS[answer_index]))
            .unwrap();
        assert!(option_line.contains("builds"));
        assert!(option_line.contains("strengthens"));

        // The explanation substitutes the blanks back with the key words.
        assert!(item.explanation.contains("(A)builds(builds)"));
        assert!(item.explanation.contains("(B)strengthens(strengthens)"));
        assert!(item.explanation.contains("breaks(to destroy)"));
    }

    #[tokio::test]
    async fn test_summary_missing_tags_is_not_found() {
        let (llm, _backend) = ScriptedBackend::new()
            .rule("prefix the first with @", "Honesty builds trust.")
            .into_client();

        let result = generate(&llm, "Honesty builds trust. It matters.").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
