//! Gist items: title, topic, claim, and main idea. The four types share
//! one chain shape and differ only in prompts, distractor strategy, and
//! the closing line of the explanation, so they are one parameterized
//! orchestrator rather than four near-duplicates.
//!
//! Chain: check whether the passage states a claim/controlling idea → if
//! not, rewrite it once so it does → generate the correct option → generate
//! four distractors (batched in one call for title/topic, chained for
//! claim/main-idea) → order by length → explain.

use rand::thread_rng;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{LlmClient, LlmError};
use crate::text::options::{assemble_options, OrderPolicy};
use crate::text::template::render;

use super::GeneratedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GistKind {
    Title,
    Topic,
    Claim,
    MainIdea,
}

/// How the four distractors are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DistractorMode {
    /// One prompt returns four lines.
    Batched,
    /// Four prompts, each shown everything generated so far.
    Chained,
}

struct GistConfig {
    stem: &'static str,
    /// What the correct option is called in the explanation's closing line.
    noun: &'static str,
    correct_prompt: &'static str,
    mode: DistractorMode,
    /// Chained items also cite the sentence that states the gist.
    locate_sentence: bool,
}

const CHECK_CLAIM_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Does the passage below contain a sentence that explicitly states the writer's central claim \
or controlling idea? Answer only YES or NO.\n\n\
Passage: {{p}}";

const REWRITE_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Rewrite the passage below so that it explicitly states its central claim in one of its \
sentences, changing as little else as possible. Keep the tone, topic, and length. Output the \
rewritten passage in one paragraph.\n\n\
Passage: {{p}}";

const TITLE_CORRECT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Write the best title for the passage below: a concise English phrase of three to eight words, \
no quotation marks, no final period.\n\n\
Passage: {{p}}";

const TOPIC_CORRECT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
State the topic of the passage below as a concise English noun phrase of four to ten words, \
in lowercase, no final period.\n\n\
Passage: {{p}}";

const CLAIM_CORRECT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
State the writer's central claim in the passage below as one complete English sentence.\n\n\
Passage: {{p}}";

const MAIN_IDEA_CORRECT_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
State the main idea of the passage below as one complete English sentence.\n\n\
Passage: {{p}}";

const BATCHED_DISTRACTORS_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
The correct answer to the question \"{{stem}}\" for the passage below is:\n{{c}}\n\n\
Produce four wrong options of the same form and similar length. Each must be plausible at a \
glance but fail to capture the passage: too narrow, too broad, or off-topic. Output exactly \
four lines, one option per line, no numbering.\n\n\
Passage: {{p}}";

const CHAINED_DISTRACTOR_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
The correct answer to the question \"{{stem}}\" for the passage below is:\n{{c}}\n\
Wrong options so far:\n{{sofar}}\n\n\
Produce one more wrong option of the same form and similar length, clearly different from all \
of the above: plausible at a glance but too narrow, too broad, or off-topic for the passage.\n\n\
Passage: {{p}}";

const EXPLAIN_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
In one or two sentences, explain what the passage below is about, as grounds for the answer \
\"{{c}}\". Do not quote the passage directly.\n\n\
Passage: {{p}}";

const LOCATE_SENTENCE_PROMPT: &str = "Do not respond in conversational form. Only output the result.\n\
Quote the single sentence of the passage below that states \"{{c}}\" most explicitly. Output \
the sentence only.\n\n\
Passage: {{p}}";

fn config(kind: GistKind) -> GistConfig {
    match kind {
        GistKind::Title => GistConfig {
            stem: "Which of the following is the best title for the passage?",
            noun: "title",
            correct_prompt: TITLE_CORRECT_PROMPT,
            mode: DistractorMode::Batched,
            locate_sentence: false,
        },
        GistKind::Topic => GistConfig {
            stem: "Which of the following best states the topic of the passage?",
            noun: "topic",
            correct_prompt: TOPIC_CORRECT_PROMPT,
            mode: DistractorMode::Batched,
            locate_sentence: false,
        },
        GistKind::Claim => GistConfig {
            stem: "Which statement best expresses the writer's claim in the passage?",
            noun: "claim",
            correct_prompt: CLAIM_CORRECT_PROMPT,
            mode: DistractorMode::Chained,
            locate_sentence: true,
        },
        GistKind::MainIdea => GistConfig {
            stem: "Which of the following best expresses the main idea of the passage?",
            noun: "main idea",
            correct_prompt: MAIN_IDEA_CORRECT_PROMPT,
            mode: DistractorMode::Chained,
            locate_sentence: true,
        },
    }
}

/// Generates a gist item of the given kind.
pub async fn generate(
    llm: &LlmClient,
    passage: &str,
    kind: GistKind,
) -> Result<GeneratedItem, AppError> {
    let cfg = config(kind);

    // A passage with no explicit claim sentence is rewritten once so the
    // correct option has something to anchor to.
    let has_claim = llm
        .complete(&render(CHECK_CLAIM_PROMPT, &[("p", passage)])?)
        .await?;
    let working = if has_claim.trim().eq_ignore_ascii_case("no") {
        info!("no explicit claim sentence; rewriting passage once");
        llm.complete(&render(REWRITE_PROMPT, &[("p", passage)])?)
            .await?
    } else {
        passage.trim().to_string()
    };

    let correct = llm
        .complete(&render(cfg.correct_prompt, &[("p", &working)])?)
        .await?;

    let distractors = match cfg.mode {
        DistractorMode::Batched => {
            let raw = llm
                .complete(&render(
                    BATCHED_DISTRACTORS_PROMPT,
                    &[("stem", cfg.stem), ("c", &correct), ("p", &working)],
                )?)
                .await?;
            let lines: Vec<String> = raw
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .take(4)
                .collect();
            if lines.len() < 4 {
                return Err(AppError::Llm(LlmError::Unusable(format!(
                    "expected four distractor lines, got {}",
                    lines.len()
                ))));
            }
            lines
        }
        DistractorMode::Chained => {
            let mut acc: Vec<String> = Vec::with_capacity(4);
            for _ in 0..4 {
                let sofar = if acc.is_empty() {
                    "(none yet)".to_string()
                } else {
                    acc.join("\n")
                };
                let next = llm
                    .complete(&render(
                        CHAINED_DISTRACTOR_PROMPT,
                        &[
                            ("stem", cfg.stem),
                            ("c", &correct),
                            ("sofar", &sofar),
                            ("p", &working),
                        ],
                    )?)
                    .await?;
                acc.push(next);
            }
            acc
        }
    };

    let set = assemble_options(&correct, &distractors, OrderPolicy::ByLength, &mut thread_rng())?;
    let answer = set.answer_label().to_string();

    let grounds = llm
        .complete(&render(EXPLAIN_PROMPT, &[("p", &working), ("c", &correct)])?)
        .await?;
    let located = if cfg.locate_sentence {
        let sentence = llm
            .complete(&render(
                LOCATE_SENTENCE_PROMPT,
                &[("p", &working), ("c", &correct)],
            )?)
            .await?;
        format!(" The {} is stated most explicitly in the sentence \"{sentence}\".", cfg.noun)
    } else {
        String::new()
    };
    let explanation = format!(
        "Answer: {answer}\n{grounds}{located} Therefore, option {answer} is the most appropriate {}.",
        cfg.noun
    );

    let problem = format!("{}\n\n{working}\n\n{}", cfg.stem, set.numbered_lines());

    Ok(GeneratedItem::new(problem, answer, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[tokio::test]
    async fn test_title_batched_end_to_end() {
        let passage = "Cities are planting more trees. Shade cools streets in summer. \
                       Leaves trap dust from the air. Parks invite people outdoors.";
        let (llm, _backend) = ScriptedBackend::new()
            .rule("Answer only YES or NO", "YES")
            .rule("best title for the passage below", "Why Cities Need Trees")
            .rule(
                "four wrong options",
                "The History of Parks\nHow Dust Forms\nSummer in the City\nStreets Without Names",
            )
            .rule("as grounds for the answer", "The passage lists the benefits urban trees bring.")
            .into_client();

        let item = generate(&llm, passage, GistKind::Title).await.unwrap();

        let answer_line = item
            .problem
            .lines()
            .find(|l| l.starts_with(item.answer.as_str()))
            .unwrap();
        assert!(answer_line.contains("Why Cities Need Trees"));
        assert!(item.explanation.ends_with("the most appropriate title."));
    }

    #[tokio::test]
    async fn test_claim_rewrites_when_no_claim_sentence() {
        let passage = "Some people walk. Others ride bikes.";
        let rewritten = "Everyone should commute actively. Some people walk. Others ride bikes.";
        let (llm, backend) = ScriptedBackend::new()
            .rule("Answer only YES or NO", "NO")
            .rule("explicitly states its central claim", rewritten)
            .rule("writer's central claim in the passage", "Active commuting benefits everyone.")
            .rule_seq(
                "one more wrong option",
                &[
                    "Bikes are faster than buses.",
                    "Walking is only for short trips.",
                    "Commuting should be abolished entirely.",
                    "Cars are the most comfortable option.",
                ],
            )
            .rule("as grounds for the answer", "The passage promotes active commuting.")
            .rule("most explicitly", "Everyone should commute actively.")
            .into_client();

        let item = generate(&llm, passage, GistKind::Claim).await.unwrap();

        assert_eq!(backend.calls_matching("explicitly states its central claim"), 1);
        // The rewritten passage, not the original, appears in the stem.
        assert!(item.problem.contains(rewritten));
        assert!(item
            .explanation
            .contains("stated most explicitly in the sentence \"Everyone should commute actively.\""));

        let answer_line = item
            .problem
            .lines()
            .find(|l| l.starts_with(item.answer.as_str()))
            .unwrap();
        assert!(answer_line.contains("Active commuting benefits everyone."));
    }
}
