//! Option assembly and answer labeling.
//!
//! The correct candidate's position is tracked through deduplication and
//! ordering rather than re-derived by string comparison afterwards. The
//! label attached to that position is therefore correct by construction;
//! the only way to fail is a correct candidate that is empty after
//! trimming, which is a hard error, never a silent default to ①.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// The fixed five-symbol label alphabet for multiple-choice options.
pub const OPTION_LABELS: [&str; 5] = ["①", "②", "③", "④", "⑤"];

/// How an option set is ordered before labeling. Both policies are
/// legitimate, item-type-dependent configuration, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Ascending string length (character count), stable on ties.
    ByLength,
    /// Uniform random shuffle.
    Shuffle,
}

#[derive(Debug, Error)]
pub enum OptionError {
    #[error("answer not found among assembled options: {0}")]
    AnswerNotFound(String),
}

/// An ordered, labeled option set with the answer position computed.
#[derive(Debug, Clone)]
pub struct OptionSet {
    pub options: Vec<String>,
    pub answer_index: usize,
}

impl OptionSet {
    pub fn answer_label(&self) -> &'static str {
        OPTION_LABELS[self.answer_index]
    }

    /// Options rendered one per line: `① word`.
    pub fn numbered_lines(&self) -> String {
        self.options
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{} {}", OPTION_LABELS[i], text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Assembles an option set from the correct candidate and its distractors:
/// trims all entries, drops empties, deduplicates case-insensitively
/// (the correct candidate always survives deduplication), orders per
/// `policy`, and records where the correct candidate landed.
pub fn assemble_options<R: Rng>(
    correct: &str,
    distractors: &[String],
    policy: OrderPolicy,
    rng: &mut R,
) -> Result<OptionSet, OptionError> {
    let correct = correct.trim();
    if correct.is_empty() {
        return Err(OptionError::AnswerNotFound(
            "the correct candidate is empty".to_string(),
        ));
    }

    // The correct entry goes first so case-insensitive dedup keeps it.
    let mut entries: Vec<(bool, String)> = vec![(true, correct.to_string())];
    for distractor in distractors {
        let trimmed = distractor.trim();
        if trimmed.is_empty() {
            continue;
        }
        let duplicate = entries
            .iter()
            .any(|(_, existing)| existing.eq_ignore_ascii_case(trimmed));
        if !duplicate {
            entries.push((false, trimmed.to_string()));
        }
    }

    match policy {
        OrderPolicy::ByLength => {
            entries.sort_by_key(|(_, text)| text.chars().count());
        }
        OrderPolicy::Shuffle => {
            entries.shuffle(rng);
        }
    }

    if entries.len() > OPTION_LABELS.len() {
        entries.truncate(OPTION_LABELS.len());
    }

    let answer_index = entries
        .iter()
        .position(|(is_correct, _)| *is_correct)
        .ok_or_else(|| {
            OptionError::AnswerNotFound("the correct candidate did not survive assembly".to_string())
        })?;

    Ok(OptionSet {
        options: entries.into_iter().map(|(_, text)| text).collect(),
        answer_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_by_length_ordering() {
        let mut rng = StdRng::seed_from_u64(1);
        let set = assemble_options(
            "medium",
            &strings(&["a", "elephantine", "hug", "disproportion"]),
            OrderPolicy::ByLength,
            &mut rng,
        )
        .unwrap();
        assert_eq!(set.options, vec!["a", "hug", "medium", "elephantine", "disproportion"]);
        assert_eq!(set.answer_index, 2);
        assert_eq!(set.answer_label(), "③");
    }

    #[test]
    fn test_answer_label_matches_correct_position() {
        // Property: across randomized distractor sets and both policies,
        // the option at the computed answer index is the correct candidate.
        let mut rng = StdRng::seed_from_u64(42);
        for round in 0..200 {
            let correct = format!("correct{}", "x".repeat(round % 11));
            let distractors: Vec<String> = (0..4)
                .map(|i| format!("d{}{}", i, "y".repeat(rng.gen_range(0..12))))
                .collect();
            let policy = if round % 2 == 0 {
                OrderPolicy::ByLength
            } else {
                OrderPolicy::Shuffle
            };
            let set = assemble_options(&correct, &distractors, policy, &mut rng).unwrap();
            assert_eq!(set.options[set.answer_index], correct.trim());
            assert!(set.answer_index < set.options.len());
        }
    }

    #[test]
    fn test_dedup_drops_distractor_equal_to_correct() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = assemble_options(
            "dog",
            &strings(&["dog", "DOG", "wolf"]),
            OrderPolicy::ByLength,
            &mut rng,
        )
        .unwrap();
        assert_eq!(set.options, vec!["dog", "wolf"]);
        assert_eq!(set.answer_index, 0);
    }

    #[test]
    fn test_empty_entries_are_dropped() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = assemble_options(
            "dog",
            &strings(&["", "  ", "wolf"]),
            OrderPolicy::ByLength,
            &mut rng,
        )
        .unwrap();
        assert_eq!(set.options.len(), 2);
    }

    #[test]
    fn test_empty_correct_is_hard_error() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = assemble_options("  ", &strings(&["wolf"]), OrderPolicy::ByLength, &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn test_correct_trim_is_preserved_case() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = assemble_options("  Dog  ", &strings(&["wolf"]), OrderPolicy::ByLength, &mut rng)
            .unwrap();
        assert!(set.options.contains(&"Dog".to_string()));
    }

    #[test]
    fn test_numbered_lines_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = assemble_options(
            "bb",
            &strings(&["a", "ccc"]),
            OrderPolicy::ByLength,
            &mut rng,
        )
        .unwrap();
        assert_eq!(set.numbered_lines(), "① a\n② bb\n③ ccc");
    }
}
