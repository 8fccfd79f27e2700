//! Option counting for wrong answers
//!
//! A wrong answer is expected to list as many comma-separated options as the
//! question has correct answers. Commas inside dates ("July 4, 1776") and
//! thousands separators ("1,000") are not option separators.

use regex::{Captures, Regex};

use crate::bank::QuestionBank;
use crate::compare::{StructuralFinding, StructuralKind};

/// Stand-in for commas that must not be counted
const MASKED_COMMA: &str = "\u{2063}";

/// Spans whose commas are not option separators
const MASKING_PATTERNS: &[&str] = &[
    // English month names
    r"(?i)\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}\b",
    // Spanish month names
    r"(?i)\b(?:enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|octubre|noviembre|diciembre)\s+\d{1,2},?\s+\d{4}\b",
    // French month names
    r"(?i)\b(?:janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)\s+\d{1,2},?\s+\d{4}\b",
    // Any other "<word> <day>, <year>"
    r"\b\w+\s+\d{1,2},\s+\d{4}\b",
    // Thousands separators
    r"\b\d{1,3}(?:,\d{3})+\b",
];

/// Counts options in wrong answers
#[derive(Debug, Clone)]
pub struct OptionCounter {
    masks: Vec<Regex>,
}

impl OptionCounter {
    pub fn new() -> Result<Self, regex::Error> {
        let masks = MASKING_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { masks })
    }

    /// Count the comma-separated options in an answer text
    ///
    /// Blank text counts as zero options.
    pub fn count_options(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }

        let mut masked = text.to_string();
        for mask in &self.masks {
            masked = mask
                .replace_all(&masked, |caps: &Captures| caps[0].replace(',', MASKED_COMMA))
                .into_owned();
        }

        masked.matches(',').count() + 1
    }

    /// Flag wrong answers whose option count differs from the number of
    /// correct answers
    pub fn check_option_counts(&self, bank: &QuestionBank) -> Vec<StructuralFinding> {
        bank.iter()
            .flat_map(|question| {
                let expected = question.correct_answers.len();
                question
                    .wrong_answers
                    .iter()
                    .enumerate()
                    .filter_map(move |(wrong_index, answer)| {
                        let actual = self.count_options(&answer.text);
                        (actual != expected).then(|| {
                            StructuralFinding::new(
                                question.id,
                                StructuralKind::OptionCountMismatch {
                                    wrong_index,
                                    expected,
                                    actual,
                                },
                            )
                        })
                    })
            })
            .collect()
    }
}
