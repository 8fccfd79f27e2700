//! Structural comparison between a canonical and a localized bank
//!
//! Entries are joined on `id`. Anything that does not line up (missing or
//! extra entries, answer arrays of different length) becomes a
//! [`StructuralFinding`]; nothing here ever aborts the scan.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::bank::{Question, QuestionBank};

/// Which answer array a count refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerKind {
    Correct,
    Wrong,
}

/// The kind of structural defect
///
/// Variant order is the tie-breaker when several findings share an id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StructuralKind {
    /// Present in the canonical bank only
    MissingEntry,
    /// Present in the localized bank only
    ExtraEntry,
    AnswerCountMismatch {
        answers: AnswerKind,
        expected: usize,
        actual: usize,
    },
    /// A wrong answer lists a different number of options than there are
    /// correct answers
    #[serde(rename_all = "camelCase")]
    OptionCountMismatch {
        wrong_index: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StructuralFinding {
    pub id: u32,
    #[serde(flatten)]
    pub kind: StructuralKind,
}

impl StructuralFinding {
    pub fn new(id: u32, kind: StructuralKind) -> Self {
        Self { id, kind }
    }
}

/// Structural findings sorted by id, then by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StructuralReport {
    findings: Vec<StructuralFinding>,
}

impl StructuralReport {
    pub fn from_findings(mut findings: Vec<StructuralFinding>) -> Self {
        findings.sort();
        findings.dedup();
        Self { findings }
    }

    /// Merge more findings while keeping the ordering
    pub fn extend(&mut self, findings: impl IntoIterator<Item = StructuralFinding>) {
        self.findings.extend(findings);
        self.findings.sort();
        self.findings.dedup();
    }

    pub fn findings(&self) -> &[StructuralFinding] {
        &self.findings
    }

    pub fn for_id(&self, id: u32) -> impl Iterator<Item = &StructuralFinding> + '_ {
        self.findings.iter().filter(move |f| f.id == id)
    }

    /// Distinct ids with at least one finding
    pub fn ids(&self) -> BTreeSet<u32> {
        self.findings.iter().map(|f| f.id).collect()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

fn index_by_id(bank: &QuestionBank) -> BTreeMap<u32, &Question> {
    bank.iter().map(|q| (q.id, q)).collect()
}

/// Compare a localized bank against the canonical one
pub fn compare(canonical: &QuestionBank, localized: &QuestionBank) -> StructuralReport {
    let expected_index = index_by_id(canonical);
    let actual_index = index_by_id(localized);
    let mut findings = Vec::new();

    for (&id, expected) in &expected_index {
        let Some(actual) = actual_index.get(&id) else {
            findings.push(StructuralFinding::new(id, StructuralKind::MissingEntry));
            continue;
        };

        let counts = [
            (AnswerKind::Correct, expected.correct_answers.len(), actual.correct_answers.len()),
            (AnswerKind::Wrong, expected.wrong_answers.len(), actual.wrong_answers.len()),
        ];
        for (answers, expected_len, actual_len) in counts {
            if expected_len != actual_len {
                findings.push(StructuralFinding::new(
                    id,
                    StructuralKind::AnswerCountMismatch {
                        answers,
                        expected: expected_len,
                        actual: actual_len,
                    },
                ));
            }
        }
    }

    findings.extend(
        actual_index
            .keys()
            .filter(|id| !expected_index.contains_key(id))
            .map(|&id| StructuralFinding::new(id, StructuralKind::ExtraEntry)),
    );

    debug!(
        canonical = canonical.len(),
        localized = localized.len(),
        findings = findings.len(),
        "structural comparison finished"
    );

    StructuralReport::from_findings(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Answer;

    fn question(id: u32, correct: usize, wrong: usize) -> Question {
        Question {
            id,
            prompt: format!("Q{id}"),
            correct_answers: (0..correct).map(|i| Answer::new(format!("A{i}"), "R")).collect(),
            wrong_answers: (0..wrong).map(|i| Answer::new(format!("W{i}"), "R")).collect(),
        }
    }

    fn bank(questions: Vec<Question>) -> QuestionBank {
        QuestionBank::new(None, questions)
    }

    #[test]
    fn test_matching_banks_yield_empty_report() {
        let canonical = bank(vec![question(1, 1, 3), question(2, 2, 3)]);
        // Order in the file does not matter, only ids and lengths
        let localized = bank(vec![question(2, 2, 3), question(1, 1, 3)]);
        let report = compare(&canonical, &localized);
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
    }

    #[test]
    fn test_missing_and_extra_entries() {
        let canonical = bank(vec![question(1, 1, 0), question(2, 1, 0)]);
        let localized = bank(vec![question(1, 1, 0), question(5, 1, 0), question(3, 1, 0)]);

        let report = compare(&canonical, &localized);
        assert_eq!(
            report.findings(),
            &[
                StructuralFinding::new(2, StructuralKind::MissingEntry),
                StructuralFinding::new(3, StructuralKind::ExtraEntry),
                StructuralFinding::new(5, StructuralKind::ExtraEntry),
            ]
        );
    }

    #[test]
    fn test_swapping_banks_inverts_missing_and_extra() {
        let a = bank(vec![question(1, 1, 0), question(2, 1, 0)]);
        let b = bank(vec![question(1, 1, 0), question(9, 1, 0)]);

        let forward = compare(&a, &b);
        let backward = compare(&b, &a);

        assert_eq!(
            forward.findings(),
            &[
                StructuralFinding::new(2, StructuralKind::MissingEntry),
                StructuralFinding::new(9, StructuralKind::ExtraEntry),
            ]
        );
        assert_eq!(
            backward.findings(),
            &[
                StructuralFinding::new(2, StructuralKind::ExtraEntry),
                StructuralFinding::new(9, StructuralKind::MissingEntry),
            ]
        );
    }

    #[test]
    fn test_answer_count_mismatches_are_ordered() {
        let canonical = bank(vec![question(4, 2, 3), question(1, 1, 3)]);
        let localized = bank(vec![question(4, 1, 2), question(1, 1, 4)]);

        let report = compare(&canonical, &localized);
        assert_eq!(
            report.findings(),
            &[
                StructuralFinding::new(
                    1,
                    StructuralKind::AnswerCountMismatch {
                        answers: AnswerKind::Wrong,
                        expected: 3,
                        actual: 4
                    }
                ),
                StructuralFinding::new(
                    4,
                    StructuralKind::AnswerCountMismatch {
                        answers: AnswerKind::Correct,
                        expected: 2,
                        actual: 1
                    }
                ),
                StructuralFinding::new(
                    4,
                    StructuralKind::AnswerCountMismatch {
                        answers: AnswerKind::Wrong,
                        expected: 3,
                        actual: 2
                    }
                ),
            ]
        );
        assert_eq!(report.ids().into_iter().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(report.for_id(4).count(), 2);
    }

    #[test]
    fn test_extend_keeps_order() {
        let mut report = StructuralReport::from_findings(vec![StructuralFinding::new(
            3,
            StructuralKind::ExtraEntry,
        )]);
        report.extend([
            StructuralFinding::new(
                3,
                StructuralKind::OptionCountMismatch {
                    wrong_index: 0,
                    expected: 2,
                    actual: 1,
                },
            ),
            StructuralFinding::new(1, StructuralKind::MissingEntry),
        ]);

        let ids: Vec<_> = report.findings().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3, 3]);
        assert_eq!(report.findings()[1].kind, StructuralKind::ExtraEntry);
    }

    #[test]
    fn test_serialized_shape() {
        let finding = StructuralFinding::new(
            7,
            StructuralKind::OptionCountMismatch {
                wrong_index: 1,
                expected: 3,
                actual: 2,
            },
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "type": "optionCountMismatch",
                "wrongIndex": 1,
                "expected": 3,
                "actual": 2
            })
        );

        let missing = serde_json::to_value(StructuralFinding::new(2, StructuralKind::MissingEntry)).unwrap();
        assert_eq!(missing, serde_json::json!({"id": 2, "type": "missingEntry"}));
    }
}
