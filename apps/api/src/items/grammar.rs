//! Grammar-error items: five sentences get one grammatical span underlined
//! each, one span is corrupted according to its category's rule, and the
//! reader must find the ungrammatical one.
//!
//! Chain: expand the passage once if it has fewer than five sentences →
//! assign a grammar tag to five sentences, working down the priority
//! groups, confirming each assignment → mark the tagged span in each
//! sentence → corrupt the longest corruptible marked sentence → reassemble
//! with ①–⑤ on the marked spans → explain the corrupted one.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::text::options::OPTION_LABELS;
use crate::text::template::render;

use super::{ensure_min_sentences, GeneratedItem};

const STEM: &str = "Which underlined part is grammatically incorrect?";

const REQUIRED_TAGS: usize = 5;
const MIN_SENTENCES: usize = 5;

const TAG_SELECT_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the result.\n\n\
The following grammar tags are defined as follows:\n{{tag_list}}\n\n\
If the sentence below contains one of the listed grammar elements, return the corresponding \
letter only, without any punctuation (e.g. a). If none are present, return 'none'.\n\n\
Sentence: {{s}}";

const CONFIRM_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the result.\n\
Does the sentence below contain the following grammar feature? If so, answer 'yes'; if not, \
say 'no'. Grammar feature: {{tag_name}}\n\n\
Sentence: {{s}}";

const MARK_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the result.\n\n\
Your task is to identify exactly one word or phrase in the sentence that matches the grammar \
category \"{{tag_name}}\" (tag code: {{t}}) according to the rule provided below. Wrap only \
that part in angle brackets < >.\n\n\
Rule: {{rule}}\n\n\
Sentence: {{s}}\n\n\
Output the full sentence, preserving all original text, and mark only the matched part with \
angle brackets. Only one set of brackets should be used.";

const VERB_MARK_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the result.\n\n\
From the given sentence, review all words in the sentence except modal verbs, articles, and \
nouns. Select one word that is typically considered challenging, and wrap only that word in \
angle brackets < >. Output the full sentence, preserving all original text, and mark only the \
chosen word with angle brackets. Only one set of brackets should be used.\n\n\
Sentence: {{s}}";

const CORRUPT_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the grammatically incorrect sentence.\n\n\
Your task is to alter the word or phrase inside the angle brackets (< >) in the given sentence \
to make the sentence grammatically incorrect. The type of grammatical error should follow the \
instruction given below:\n({{t}}): {{rule}}\n\n\
According to the rule, replace the part inside < > with a grammatically incorrect version.\n\
Output only the altered sentence with the modified part still enclosed in angle brackets < >.\n\n\
{{s}}";

const EXPLAIN_WRONG_PROMPT: &str = "You are part of a grammar question generation system. \
Never respond in conversational form. Output only the result.\n\
The sentence below is grammatically incorrect. Following the instruction, write a one-sentence \
explanation of the error in the form \"(original form) should be corrected to (correct form) \
because ...\". The existing < > marks must not appear in your output.\n\n\
Instruction: {{rule}}\n\n\
Sentence: {{s}}";

/// One grammar category. `corrupt_rule` is `None` for categories that have
/// no natural incorrect version; those are never chosen as the wrong item.
struct GrammarTag {
    code: char,
    name: &'static str,
    bracket_rule: &'static str,
    corrupt_rule: Option<&'static str>,
    wrong_rule: &'static str,
}

const GRAMMAR_TAGS: &[GrammarTag] = &[
    GrammarTag {
        code: 'a',
        name: "number agreement between a lengthy subject and a verb",
        bracket_rule: "Bracket only the verb (that agrees in number with the lengthy subject). \
            For example, the woman who teaches our kids <walks> to school every day.",
        corrupt_rule: Some(
            "Change the verb to create a subject-verb agreement error. (For example, from \
            \"she <walks> to school every day.\" to \"she <walk> to school every day.\")",
        ),
        wrong_rule: "Explain that the verb must agree in number with its lengthy subject.",
    },
    GrammarTag {
        code: 'b',
        name: "an adverb ending with the \"-ly\" suffix that modifies a verb",
        bracket_rule: "Bracket only the adverb (that modifies the verb). For example, he ran \
            <quickly> to catch the bus.",
        corrupt_rule: Some(
            "Replace the adverb with an adjective. (For example, from \"he ran <quickly> to \
            catch the bus.\" to \"he ran <quick> to catch the bus.\")",
        ),
        wrong_rule: "Explain that an adverb slot is occupied by an adjective.",
    },
    GrammarTag {
        code: 'c',
        name: "participial clause",
        bracket_rule: "Bracket only the participle (that functions as an adverbial clause). \
            For example, <Smiling>, she opened the door.",
        corrupt_rule: Some(
            "If it is a present participle, change it to a past participle; if it is a past \
            participle, change it to a present participle. (For example, from \"<Smiling>, she \
            opened the door.\" to \"<Smile>, she opened the door.\")",
        ),
        wrong_rule: "Explain whether the participial clause is active or passive with respect \
            to its subject.",
    },
    GrammarTag {
        code: 'd',
        name: "passive voice (be + past participle)",
        bracket_rule: "Bracket only the passive verb phrase (be + past participle). For \
            example, the book <was written> by a famous author.",
        corrupt_rule: Some(
            "Replace the passive voice with the active voice. (For example, from \"the book \
            <was written> by a famous author.\" to \"the book <wrote> by a famous author.\")",
        ),
        wrong_rule: "Explain that a tensed passive verb phrase is required here.",
    },
    GrammarTag {
        code: 'e',
        name: "a relative pronoun that immediately follows a preposition, as in \"in which\"",
        bracket_rule: "Bracket only the preposition and the relative pronoun together. For \
            example, the car, <in which> a cat was lying, was a black SUV.",
        corrupt_rule: Some(
            "Replace the combination of the preposition and the relative pronoun with just the \
            relative pronoun. (For example, from \"The car, <in which> a cat was lying, was a \
            black SUV.\" to \"The car, <which> a cat was lying, was a black SUV.\")",
        ),
        wrong_rule: "Explain that the following clause is complete, so the preposition must be \
            kept.",
    },
    GrammarTag {
        code: 'f',
        name: "result clause introduced by <so ... that>",
        bracket_rule: "Bracket only the conjunction (that) introducing the result clause. For \
            example, she was so tired <that> she fell asleep at her desk.",
        corrupt_rule: None,
        wrong_rule: "Explain the <so ... that> result construction.",
    },
    GrammarTag {
        code: 'g',
        name: "dummy-it with extraposition of an infinitive",
        bracket_rule: "Bracket only the infinitive phrase (to + verb) acting as the logical \
            subject. For example, it is important <to drink> enough water.",
        corrupt_rule: None,
        wrong_rule: "Explain the dummy-it extraposition construction.",
    },
    GrammarTag {
        code: 'h',
        name: "participle that modifies a noun",
        bracket_rule: "Bracket only the participle (used as an adjective modifying a noun). \
            For example, we saw the <broken> window.",
        corrupt_rule: Some(
            "Replace the participle with the wrong one. (For example, from \"we saw the \
            <broken> window.\" to \"we saw the <breaking> window.\")",
        ),
        wrong_rule: "Explain whether the participle is active or passive with respect to the \
            noun it modifies.",
    },
    GrammarTag {
        code: 'i',
        name: "to-infinitive expressing purpose or result",
        bracket_rule: "Bracket only the infinitive (that shows purpose or result). For \
            example, he studies hard <to pass> the exam.",
        corrupt_rule: None,
        wrong_rule: "Explain the purpose/result use of the to-infinitive.",
    },
    GrammarTag {
        code: 'j',
        name: "the <it ~ that ...> cleft (emphasis) construction",
        bracket_rule: "Bracket only the word (that) introducing the cleft clause. For example, \
            it was John <that> broke the window.",
        corrupt_rule: Some(
            "Replace \"that\" with \"what\". (For example, from \"it was John <that> broke the \
            window.\" to \"it was John <what> broke the window.\")",
        ),
        wrong_rule: "Explain that the <it is ... that ~> cleft construction requires \"that\".",
    },
    GrammarTag {
        code: 'k',
        name: "the <by + v-ing> pattern",
        bracket_rule: "Bracket only the gerund (that follows by in a causal phrase). For \
            example, you can improve your English by <reading> every day.",
        corrupt_rule: None,
        wrong_rule: "Explain the <by + gerund> construction.",
    },
    GrammarTag {
        code: 'l',
        name: "a gerund used as the subject",
        bracket_rule: "Bracket only the gerund (that functions as the subject). For example, \
            <Swimming> is a good exercise.",
        corrupt_rule: Some(
            "Replace the gerund subject with a base verb. (For example, from \"<Swimming> is a \
            good exercise.\" to \"<Swim> is a good exercise.\")",
        ),
        wrong_rule: "Explain that the subject position requires a gerund, not a base verb.",
    },
    GrammarTag {
        code: 'm',
        name: "the relative adverb where",
        bracket_rule: "Bracket only the relative adverb (where) introducing the clause. For \
            example, this is the park <where> we played yesterday.",
        corrupt_rule: Some(
            "Replace \"where\" with \"which\". (For example, from \"this is the park <where> \
            we played yesterday.\" to \"this is the park <which> we played yesterday.\")",
        ),
        wrong_rule: "Explain that the following clause is complete and denotes a place, so the \
            relative adverb is required.",
    },
    GrammarTag {
        code: 'n',
        name: "an interrogative word",
        bracket_rule: "Bracket only the wh-word used in the indirect question. For example, I \
            don't know <how> he solved the problem.",
        corrupt_rule: Some(
            "Replace the wh-word with a wrong one. (For example, from \"I don't know <how> he \
            solved the problem.\" to \"I don't know <what> he solved the problem.\")",
        ),
        wrong_rule: "Explain that the indirect question requires the appropriate wh-word.",
    },
    GrammarTag {
        code: 'o',
        name: "a complementizer \"that\" (not a relative pronoun) following a noun such as \
            fact or belief",
        bracket_rule: "Bracket only the word (that) introducing the noun clause. For example, \
            the fact <that> he lied surprised me.",
        corrupt_rule: Some(
            "Replace \"that\" with \"what\". (For example, from \"the fact <that> he lied \
            surprised me.\" to \"the fact <what> he lied surprised me.\")",
        ),
        wrong_rule: "Explain that an appositive noun clause after such a noun requires \
            \"that\".",
    },
    GrammarTag {
        code: 'p',
        name: "a causative verb: \"make\", \"have\", or \"let\"",
        bracket_rule: "Bracket only the verb that follows the causative verb. For example, she \
            made him <clean> his room.",
        corrupt_rule: Some(
            "Replace the verb inside the brackets with an infinitive (to + verb). (For \
            example, from \"she made him <clean> his room.\" to \"she made him <to clean> his \
            room.\")",
        ),
        wrong_rule: "Explain that a causative verb takes a bare infinitive, not a \
            to-infinitive, as its object complement.",
    },
    GrammarTag {
        code: 'q',
        name: "\"few\" used as a subject",
        bracket_rule: "Bracket only the verb that agrees in number with the determiner 'few'. \
            For example, Few <know> the truth about the story.",
        corrupt_rule: Some(
            "Change the verb to a singular form. (For example, from \"Few <know> the truth \
            about the story.\" to \"Few <knows> the truth about the story.\")",
        ),
        wrong_rule: "Explain that \"few\" is plural, so the verb must agree in the plural.",
    },
    GrammarTag {
        code: 'r',
        name: "a pro-verb, as in \"He did not dance, but she did\"",
        bracket_rule: "Bracket only the auxiliary verb (that replaces a previously stated \
            verb). For example, she sings better than I <do>.",
        corrupt_rule: Some(
            "If the verb is do/does/did, replace it with am/is/are/was/were; if it is \
            am/is/are/was/were, replace it with do/does/did. (For example, from \"she sings \
            better than I <do>.\" to \"she sings better than I <am>.\")",
        ),
        wrong_rule: "Explain that the pro-verb must stand in for the verb repeated from the \
            earlier clause.",
    },
    GrammarTag {
        code: 's',
        name: "one of the following three: during, despite, because of",
        bracket_rule: "Bracket only the prepositional phrase (during, despite, or because of). \
            For example, we stayed indoors <because of> the rain.",
        corrupt_rule: None,
        wrong_rule: "Explain the prepositional-phrase expression.",
    },
    GrammarTag {
        code: 't',
        name: "reflexives such as himself, themselves, etc.",
        bracket_rule: "Bracket only the reflexive pronoun (ending in -self or -selves). For \
            example, he hurt <himself> while lifting weights.",
        corrupt_rule: Some(
            "Replace the reflexive pronoun with a simple object personal pronoun. (For \
            example, from \"he hurt <himself> while lifting weights.\" to \"he hurt <him> \
            while lifting weights.\")",
        ),
        wrong_rule: "Explain that a reflexive pronoun is required because the object refers \
            back to the subject.",
    },
    GrammarTag {
        code: 'u',
        name: "\"as\" followed by a clause (subject + verb)",
        bracket_rule: "Bracket only the conjunction (as) that introduces a clause. For \
            example, <As> I was leaving, it started to rain.",
        corrupt_rule: None,
        wrong_rule: "Explain the conjunction use of \"as\".",
    },
    GrammarTag {
        code: 'v',
        name: "listing of verb phrases like \"sing, dance, and laugh\"",
        bracket_rule: "Bracket only the last one among the listed verbs. For example, she \
            smiled, waved and <left>.",
        corrupt_rule: Some(
            "Replace the bracketed item with a grammatically incorrect form. (For example, \
            from \"she smiled, waved and <left>.\" to \"she smiled, waved and <leaving>.\")",
        ),
        wrong_rule: "Explain that items in a parallel listing must share one grammatical form.",
    },
    GrammarTag {
        code: 'w',
        name: "an adjective as an object complement",
        bracket_rule: "Bracket only the adjective (used as an object complement). For example, \
            the movie made her <happy>.",
        corrupt_rule: Some(
            "Replace the adjective with an adverb. (For example, from \"the movie made her \
            <happy>.\" to \"the movie made her <happily>.\")",
        ),
        wrong_rule: "Explain that the object-complement slot takes an adjective, not an \
            adverb.",
    },
    GrammarTag {
        code: 'x',
        name: "one of the following three: what, that, or whether",
        bracket_rule: "Bracket only the complementizer (what, that, or whether) introducing a \
            clause. For example, I don't know <whether> she will come.",
        corrupt_rule: Some(
            "If it is \"that\" or \"whether\", replace it with \"what\"; if it is \"what\", \
            replace it with \"that\" or \"whether\". (For example, from \"I don't know \
            <whether> she will come.\" to \"I don't know <what> she will come.\")",
        ),
        wrong_rule: "Explain which complementizer the clause type requires and why the current \
            one is wrong.",
    },
    GrammarTag {
        code: 'y',
        name: "a string of \"that of\" or \"those of\"",
        bracket_rule: "Bracket only that or those in front of the preposition of. For example, \
            \"The grass of my house is greener than <that> of your house.\"",
        corrupt_rule: Some(
            "If it is \"that\", replace it with \"those\"; if it is \"those\", replace it with \
            \"that\". (For example, from \"The grass of my house is greener than <that> of \
            your house\" to \"The grass of my house is greener than <those> of your house.\")",
        ),
        wrong_rule: "Explain that the comparative pro-form must agree in number with the noun \
            it replaces.",
    },
];

/// The fallback tag for sentences no category matched; marked sentences
/// with this tag are display-only and never corrupted.
const FALLBACK_TAG: char = 'z';

const HIGH_GROUP: &[char] = &['a', 'd', 'e'];
const MID_GROUP: &[char] = &['j', 'r', 'w', 'x', 'b', 'c', 't'];
const LOW_GROUPS: &[&[char]] = &[
    &['f', 'g', 'h', 'i', 'k'],
    &['l', 'm', 'n', 'o', 'p'],
    &['q', 's', 'u', 'v', 'y'],
];

fn tag_by_code(code: char) -> Option<&'static GrammarTag> {
    GRAMMAR_TAGS.iter().find(|t| t.code == code)
}

#[derive(Debug, Clone)]
struct TaggedSentence {
    index: usize,
    text: String,
    tag: char,
}

/// Generates a grammar-error item.
pub async fn generate(llm: &LlmClient, passage: &str) -> Result<GeneratedItem, AppError> {
    let (_working, sentences) = ensure_min_sentences(llm, passage, MIN_SENTENCES).await?;

    let mut tagged: Vec<TaggedSentence> = Vec::new();
    let mut used_tags: HashSet<char> = HashSet::new();

    assign_from_group(llm, &sentences, HIGH_GROUP, &mut tagged, &mut used_tags).await?;
    if tagged.len() < REQUIRED_TAGS {
        assign_from_group(llm, &sentences, MID_GROUP, &mut tagged, &mut used_tags).await?;
    }
    for group in LOW_GROUPS {
        if tagged.len() >= REQUIRED_TAGS {
            break;
        }
        assign_from_group(llm, &sentences, group, &mut tagged, &mut used_tags).await?;
    }

    // Whatever is still missing falls back to the display-only tag.
    if tagged.len() < REQUIRED_TAGS {
        for (index, text) in sentences.iter().enumerate() {
            if tagged.len() >= REQUIRED_TAGS {
                break;
            }
            if tagged.iter().any(|t| t.index == index) {
                continue;
            }
            tagged.push(TaggedSentence {
                index,
                text: text.clone(),
                tag: FALLBACK_TAG,
            });
        }
    }
    if tagged.len() < REQUIRED_TAGS {
        return Err(AppError::NotFound(
            "could not assign five grammar tags to the passage".to_string(),
        ));
    }

    tagged.sort_by_key(|t| t.index);
    info!(
        "assigned tags: {:?}",
        tagged.iter().map(|t| t.tag).collect::<Vec<_>>()
    );

    // Mark the tagged span in each sentence; the markings are independent
    // of one another and run unordered.
    let marked_results = join_all(tagged.iter().map(|t| {
        let llm = llm.clone();
        async move {
            let prompt = if t.tag == FALLBACK_TAG {
                render(VERB_MARK_PROMPT, &[("s", t.text.as_str())])?
            } else {
                let tag = tag_by_code(t.tag).ok_or_else(|| {
                    AppError::NotFound(format!("unknown grammar tag '{}'", t.tag))
                })?;
                render(
                    MARK_PROMPT,
                    &[
                        ("s", t.text.as_str()),
                        ("t", &t.tag.to_string()),
                        ("tag_name", tag.name),
                        ("rule", tag.bracket_rule),
                    ],
                )?
            };
            llm.complete(&prompt).await.map_err(AppError::from)
        }
    }))
    .await;
    let marked: Vec<String> = marked_results.into_iter().collect::<Result<_, _>>()?;

    // The wrong item is the longest marked sentence whose tag has a
    // corruption rule.
    let wrong_pos = marked
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let code = tagged[*i].tag;
            code != FALLBACK_TAG
                && tag_by_code(code)
                    .map(|t| t.corrupt_rule.is_some())
                    .unwrap_or(false)
        })
        .fold(None::<(usize, usize)>, |best, (i, text)| {
            let len = text.chars().count();
            match best {
                Some((_, best_len)) if best_len >= len => best,
                _ => Some((i, len)),
            }
        })
        .map(|(i, _)| i)
        .ok_or_else(|| {
            AppError::NotFound("no tagged sentence is eligible for corruption".to_string())
        })?;

    let wrong_tag = tag_by_code(tagged[wrong_pos].tag)
        .ok_or_else(|| AppError::NotFound("corruptible tag disappeared".to_string()))?;
    let corrupt_rule = wrong_tag.corrupt_rule.ok_or_else(|| {
        AppError::NotFound("selected tag has no corruption rule".to_string())
    })?;

    let corrupted = llm
        .complete(&render(
            CORRUPT_PROMPT,
            &[
                ("s", marked[wrong_pos].as_str()),
                ("t", &wrong_tag.code.to_string()),
                ("rule", corrupt_rule),
            ],
        )?)
        .await?;

    // Reassemble the passage with ①–⑤ in front of each marked span.
    let mark_pattern = regex::Regex::new(r"<([^>]+)>").expect("mark pattern is valid");
    let assembled: Vec<String> = sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            match tagged.iter().position(|t| t.index == index) {
                None => sentence.clone(),
                Some(pos) => {
                    let content = if pos == wrong_pos {
                        corrupted.as_str()
                    } else {
                        marked[pos].as_str()
                    };
                    let label = OPTION_LABELS[pos];
                    mark_pattern
                        .replace(content, format!("{label}<$1>"))
                        .into_owned()
                }
            }
        })
        .collect();
    let full_text = assembled.join(" ");

    let answer = OPTION_LABELS[wrong_pos].to_string();
    let explanation_text = llm
        .complete(&render(
            EXPLAIN_WRONG_PROMPT,
            &[("s", corrupted.as_str()), ("rule", wrong_tag.wrong_rule)],
        )?)
        .await?;
    let explanation = format!("Answer: {answer}\n{answer} {explanation_text}");

    let problem = format!("{STEM}\n\n{full_text}");

    Ok(GeneratedItem::new(problem, answer, explanation))
}

/// Tries to tag untagged sentences from one candidate group, confirming
/// each proposed tag before accepting it. Each tag code is used at most
/// once across the whole item.
async fn assign_from_group(
    llm: &LlmClient,
    sentences: &[String],
    candidates: &[char],
    tagged: &mut Vec<TaggedSentence>,
    used_tags: &mut HashSet<char>,
) -> Result<(), AppError> {
    for (index, text) in sentences.iter().enumerate() {
        if tagged.iter().any(|t| t.index == index) {
            continue;
        }
        let available: Vec<char> = candidates
            .iter()
            .copied()
            .filter(|c| !used_tags.contains(c))
            .collect();
        if available.is_empty() {
            break;
        }

        let tag_list = available
            .iter()
            .filter_map(|c| tag_by_code(*c))
            .map(|t| format!("({}) {}", t.code, t.name))
            .collect::<Vec<_>>()
            .join(", ");
        let response = llm
            .complete(&render(
                TAG_SELECT_PROMPT,
                &[("s", text.as_str()), ("tag_list", &tag_list)],
            )?)
            .await?;
        if response.eq_ignore_ascii_case("none") {
            continue;
        }
        let Some(code) = response
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
        else {
            continue;
        };
        if !available.contains(&code) {
            continue;
        }
        let Some(tag) = tag_by_code(code) else {
            continue;
        };

        let confirmed = llm
            .complete(&render(
                CONFIRM_PROMPT,
                &[("s", text.as_str()), ("tag_name", tag.name)],
            )?)
            .await?;
        if confirmed
            .trim()
            .trim_end_matches('.')
            .eq_ignore_ascii_case("yes")
        {
            tagged.push(TaggedSentence {
                index,
                text: text.clone(),
                tag: code,
            });
            used_tags.insert(code);
            if tagged.len() >= REQUIRED_TAGS {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::testing::ScriptedBackend;

    #[test]
    fn test_taxonomy_is_consistent() {
        // Tag codes are unique and every priority-group member exists.
        let mut codes: Vec<char> = GRAMMAR_TAGS.iter().map(|t| t.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), GRAMMAR_TAGS.len());

        for group in [HIGH_GROUP, MID_GROUP].into_iter().chain(LOW_GROUPS.iter().copied()) {
            for code in group {
                assert!(tag_by_code(*code).is_some(), "missing tag {code}");
            }
        }
    }

    #[tokio::test]
    async fn test_grammar_insufficient_sentences_expands_once_then_fails() {
        let (llm, backend) = ScriptedBackend::new()
            .rule("at least 5 complete English sentences", "Still short. Two sentences only.")
            .into_client();

        let result = generate(&llm, "One sentence. Another one.").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(backend.calls_matching("at least 5 complete English sentences"), 1);
    }

    #[tokio::test]
    async fn test_grammar_end_to_end() {
        let s1 = "The woman who teaches our kids walks to school.";
        let s2 = "The book was written by a famous author.";
        let s3 = "The car, in which a cat was lying, was a black SUV parked near the station.";
        let s4 = "It was John that broke the window.";
        let s5 = "She sings better than I do.";
        let passage = format!("{s1} {s2} {s3} {s4} {s5}");

        let (llm, _backend) = ScriptedBackend::new()
            .rule_seq("return the corresponding letter", &["a", "d", "e", "j", "r"])
            .rule("answer 'yes'", "yes")
            .rule_seq(
                "Wrap only that part",
                &[
                    "The woman who teaches our kids <walks> to school.",
                    "The book <was written> by a famous author.",
                    "The car, <in which> a cat was lying, was a black SUV parked near the station.",
                    "It was John <that> broke the window.",
                    "She sings better than I <do>.",
                ],
            )
            .rule(
                "grammatically incorrect version",
                "The car, <which> a cat was lying, was a black SUV parked near the station.",
            )
            .rule(
                "grammatically incorrect. Following",
                "\"which\" should be corrected to \"in which\" because the following clause is complete.",
            )
            .into_client();

        let item = generate(&llm, &passage).await.unwrap();

        // The longest corruptible marked sentence is the third one.
        assert_eq!(item.answer, "③");
        assert!(item.problem.contains("③<which>"));
        assert!(item.problem.contains("①<walks>"));
        assert!(item.problem.contains("⑤<do>"));
        assert!(item.explanation.starts_with("Answer: ③\n③ "));
    }
}
