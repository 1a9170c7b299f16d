//! Paragraph-ordering items: the passage is cut into a lead-in plus three
//! labeled chunks, the chunks are presented out of order, and the reader
//! must recover the original order.
//!
//! Chain: enumerate the valid 4-chunk splits of the sentence sequence →
//! ask the LLM which split has a uniquely recoverable order, discarding
//! ambiguous splits → shuffle the chunk labels with one of the five fixed
//! permutations → map the permutation to its answer position → explain.

use rand::Rng;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::json::extract_json;
use crate::llm_client::{LlmClient, LlmError};
use crate::text::options::OPTION_LABELS;
use crate::text::template::render;

use super::{ensure_min_sentences, GeneratedItem};

const STEM: &str =
    "Choose the most appropriate order of the parts (A), (B), and (C) following the given text.";

const MIN_SENTENCES: usize = 4;

/// The five orderings offered as options, in option order ① to ⑤.
/// (The original order A-B-C is never offered.)
const PERMUTATIONS: [[char; 3]; 5] = [
    ['a', 'c', 'b'],
    ['b', 'a', 'c'],
    ['b', 'c', 'a'],
    ['c', 'a', 'b'],
    ['c', 'b', 'a'],
];

const OPTION_LINES: &str = "① (A) - (C) - (B)\n\
② (B) - (A) - (C)\n\
③ (B) - (C) - (A)\n\
④ (C) - (A) - (B)\n\
⑤ (C) - (B) - (A)";

const VERIFY_UNIQUE_PROMPT: &str = "You are part of an English question item development system. \
Output only a JSON object, no prose.\n\n\
A paragraph-ordering question presents the lead-in text below, followed by the three parts in \
a scrambled order. The reader must recover the original order from cohesive devices \
(connectives, pronouns, article use, time sequence).\n\n\
Lead-in: {{o}}\n\
Part one: {{p}}\n\
Part two: {{q}}\n\
Part three: {{r}}\n\n\
Is the original order the only natural order of the three parts, so that the question has \
exactly one defensible answer? Respond with {\"unique\": true} or {\"unique\": false}.";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
A paragraph-ordering question was built from the passage below; the correct order of the \
parts after the lead-in is {{order}}. Write a short explanation of the cohesive devices \
(connectives, pronouns, repeated references) that force this order, ending with: \"Therefore, \
the most appropriate order is {{order}}.\"\n\n\
Passage: {{p}}";

#[derive(Debug, Deserialize)]
struct UniqueVerdict {
    unique: bool,
}

/// All ways to split `n` sentences into 4 contiguous chunks. Chunks hold at
/// most 2 sentences, or 3 once the passage has 9 or more.
pub fn four_chunk_splits(n: usize) -> Vec<[usize; 4]> {
    let max_chunk = if n >= 9 { 3 } else { 2 };
    let mut result = Vec::new();
    let mut current = [0usize; 4];
    dfs(n, max_chunk, 0, 0, &mut current, &mut result);
    result
}

fn dfs(
    n: usize,
    max_chunk: usize,
    depth: usize,
    sum: usize,
    current: &mut [usize; 4],
    result: &mut Vec<[usize; 4]>,
) {
    if depth == 4 {
        if sum == n {
            result.push(*current);
        }
        return;
    }
    if sum >= n {
        return;
    }
    for size in 1..=max_chunk {
        current[depth] = size;
        dfs(n, max_chunk, depth + 1, sum + size, current, result);
    }
}

/// Joins the sentences into 4 chunks of the given sizes.
pub fn chunk_sentences(sentences: &[String], sizes: &[usize; 4]) -> [String; 4] {
    let mut chunks: [String; 4] = Default::default();
    let mut index = 0;
    for (chunk, size) in chunks.iter_mut().zip(sizes) {
        *chunk = sentences[index..index + size].join(" ");
        index += size;
    }
    chunks
}

/// Generates an ordering item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let (working, sentences) = ensure_min_sentences(llm, passage, MIN_SENTENCES).await?;

    let splits = four_chunk_splits(sentences.len());
    if splits.is_empty() {
        return Err(AppError::NotFound(format!(
            "a passage of {} sentences cannot be split into four parts",
            sentences.len()
        )));
    }

    // Find the first split whose order is uniquely recoverable; ambiguous
    // splits are discarded.
    let mut chosen: Option<[String; 4]> = None;
    for sizes in &splits {
        let chunks = chunk_sentences(&sentences, sizes);
        let prompt = render(
            VERIFY_UNIQUE_PROMPT,
            &[
                ("o", chunks[0].as_str()),
                ("p", chunks[1].as_str()),
                ("q", chunks[2].as_str()),
                ("r", chunks[3].as_str()),
            ],
        )?;
        let raw = llm.complete(&prompt).await?;
        let verdict: UniqueVerdict = extract_json(&raw)
            .map_err(|e| AppError::Llm(LlmError::Unusable(format!("order verdict: {e}"))))?;
        if verdict.unique {
            chosen = Some(chunks);
            break;
        }
    }
    let [lead_in, p, q, r] = chosen.ok_or_else(|| {
        AppError::NotFound("no chunk split with a uniquely recoverable order".to_string())
    })?;
    info!("selected a uniquely ordered chunk split");

    // Assign the letters with one of the five fixed permutations. The
    // permutation index IS the answer index: the option table lists the
    // permutations in the same order.
    let perm_index = rand::thread_rng().gen_range(0..PERMUTATIONS.len());
    let [first, second, third] = PERMUTATIONS[perm_index];

    // Chunk p carries the letter `first`, q carries `second`, r `third`;
    // the display slots (A)(B)(C) pull the chunk holding their letter.
    let part_for = |letter: char| {
        if first == letter {
            p.clone()
        } else if second == letter {
            q.clone()
        } else {
            r.clone()
        }
    };

    let answer = OPTION_LABELS[perm_index].to_string();
    let correct_order = format!(
        "({}) - ({}) - ({})",
        first.to_ascii_uppercase(),
        second.to_ascii_uppercase(),
        third.to_ascii_uppercase()
    );

    let problem = format!(
        "{STEM}\n\n{lead_in}\n\n(A) {}\n(B) {}\n(C) {}\n\n{OPTION_LINES}",
        part_for('a'),
        part_for('b'),
        part_for('c'),
    );

    let explanation_text = llm
        .complete(&render(
            EXPLAIN_PROMPT,
            &[("order", correct_order.as_str()), ("p", &working)],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{explanation_text}");

    Ok(GeneratedItem::new(problem, answer, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[test]
    fn test_four_chunk_splits_small_passage() {
        // 4 sentences, max chunk 2: compositions of 4 into 4 parts of 1..=2.
        let splits = four_chunk_splits(4);
        assert_eq!(splits, vec![[1, 1, 1, 1]]);

        let splits = four_chunk_splits(5);
        assert_eq!(splits.len(), 4);
        assert!(splits.contains(&[2, 1, 1, 1]));
        assert!(splits.contains(&[1, 1, 1, 2]));
    }

    #[test]
    fn test_four_chunk_splits_large_passage_allows_three() {
        let splits = four_chunk_splits(9);
        assert!(!splits.is_empty());
        assert!(splits.iter().all(|s| s.iter().sum::<usize>() == 9));
        assert!(splits.iter().all(|s| s.iter().all(|&c| (1..=3).contains(&c))));
    }

    #[test]
    fn test_four_chunk_splits_impossible_counts() {
        assert!(four_chunk_splits(3).is_empty());
        assert!(four_chunk_splits(13).is_empty());
    }

    #[test]
    fn test_chunk_sentences_joins_in_order() {
        let sentences: Vec<String> = ["A.", "B.", "C.", "D.", "E."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let chunks = chunk_sentences(&sentences, &[2, 1, 1, 1]);
        assert_eq!(chunks[0], "A. B.");
        assert_eq!(chunks[1], "C.");
        assert_eq!(chunks[3], "E.");
    }

    #[test]
    fn test_permutation_table_matches_option_lines() {
        // Each option line's letter order must equal the permutation at
        // the same index; the answer computation depends on it.
        for (i, line) in OPTION_LINES.lines().enumerate() {
            let letters: Vec<char> = line
                .chars()
                .filter(|c| c.is_ascii_uppercase())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            assert_eq!(letters, PERMUTATIONS[i].to_vec(), "line {i}");
        }
    }

    #[tokio::test]
    async fn test_ordering_end_to_end() {
        let passage = "Seeds travel in many ways. Some ride the wind. \
                       Others hitch onto animal fur. A few even float across oceans.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule("exactly one defensible answer", "{\"unique\": true}")
            .rule("cohesive devices", "Each part picks up the previous one's subject. Therefore, the most appropriate order is the given one.")
            .into_client();

        let item = generate(&llm, passage).await.unwrap();

        assert!(item.problem.contains("(A) "));
        assert!(item.problem.contains("① (A) - (C) - (B)"));
        assert!(OPTION_LABELS.contains(&item.answer.as_str()));
        assert!(item.explanation.starts_with(&format!("Answer: {}", item.answer)));

        // The answer's permutation reorders the labeled parts back into the
        // original sentence order.
        let answer_index = OPTION_LABELS
            .iter()
            .position(|l| *l == item.answer)
            .unwrap();
        let perm = PERMUTATIONS[answer_index];
        let body: Vec<&str> = item.problem.lines().collect();
        let part_of = |letter: char| -> &str {
            let prefix = format!("({}) ", letter.to_ascii_uppercase());
            body.iter()
                .find(|l| l.starts_with(&prefix))
                .map(|l| &l[prefix.len()..])
                .unwrap()
        };
        let reordered = format!(
            "{} {} {}",
            part_of(perm[0]),
            part_of(perm[1]),
            part_of(perm[2])
        );
        assert_eq!(
            reordered,
            "Some ride the wind. Others hitch onto animal fur. A few even float across oceans."
        );
    }

    #[tokio::test]
    async fn test_ordering_all_splits_ambiguous_is_not_found() {
        let passage = "One. Two. Three. Four.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule("exactly one defensible answer", "{\"unique\": false}")
            .into_client();

        let result = generate(&llm, passage).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
