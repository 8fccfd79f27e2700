//! Heuristic detection of untranslated fragments
//!
//! Exact diffing against the canonical text does not work: proper nouns and
//! institution names legitimately survive translation. Instead every rule of
//! a [`RuleSet`] is matched with word-boundary semantics, then filtered:
//! - Exclusions: a match followed by an excluded word is dropped
//!   (Spanish "a tribu" is not the English article)
//! - Position: `nonInitial` rules ignore sentence-initial matches
//!
//! Detection is read-only. Choosing a replacement needs translation
//! knowledge and is left to people.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::bank::{Question, QuestionBank};
use crate::rules::{Category, PositionConstraint, Rule, RuleSet};

/// Characters that may precede the first word of a sentence
const OPENING_PUNCTUATION: &[char] = &['¿', '¡', '"', '\'', '(', '[', '«', '“', '‘', '-', '—'];

/// Characters that end a sentence
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '…'];

/// A rule that fired on a piece of text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub pattern_id: String,
    /// Text as it appears in the input, including its case
    pub matched_substring: String,
    pub occurrence_count: usize,
}

/// Part of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnswerPart {
    Text,
    Rationale,
}

/// Location of a text field inside a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Question,
    CorrectAnswer { index: usize, part: AnswerPart },
    WrongAnswer { index: usize, part: AnswerPart },
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (array, index, part) = match self {
            Field::Question => return f.write_str("question"),
            Field::CorrectAnswer { index, part } => ("correctAnswers", index, part),
            Field::WrongAnswer { index, part } => ("wrongAnswers", index, part),
        };
        let part = match part {
            AnswerPart::Text => "text",
            AnswerPart::Rationale => "rationale",
        };
        write!(f, "{}[{}].{}", array, index, part)
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A finding tagged with where it was found
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFinding {
    pub field: Field,
    #[serde(flatten)]
    pub finding: Finding,
    pub category: Category,
    pub weight: f64,
}

impl LanguageFinding {
    /// Weight times occurrences
    pub fn score(&self) -> f64 {
        self.weight * self.finding.occurrence_count as f64
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether the words of `phrase` open `rest`, whatever whitespace separates
/// them. Each word must end on a word boundary; `phrase` is already
/// lowercase.
fn starts_with_phrase(rest: &str, phrase: &str) -> bool {
    let mut tokens = rest.split_whitespace();
    let mut words = phrase.split_whitespace().peekable();
    if words.peek().is_none() {
        return false;
    }

    words.all(|word| {
        tokens.next().is_some_and(|token| {
            token
                .to_lowercase()
                .strip_prefix(word)
                .is_some_and(|tail| !tail.starts_with(is_word_char))
        })
    })
}

fn is_excluded(rule: &Rule, text: &str, end: usize) -> bool {
    rule.exclusions()
        .iter()
        .any(|phrase| starts_with_phrase(&text[end..], phrase))
}

/// Nothing but whitespace and opening punctuation between the start of the
/// sentence and `start`
fn is_sentence_initial(text: &str, start: usize) -> bool {
    for c in text[..start].chars().rev() {
        if c.is_whitespace() || OPENING_PUNCTUATION.contains(&c) {
            continue;
        }
        return SENTENCE_TERMINATORS.contains(&c);
    }
    true
}

fn detect_with_rules<'r>(text: &str, rules: &'r RuleSet) -> Vec<(&'r Rule, Finding)> {
    let mut findings = Vec::new();

    for rule in rules {
        // (matched substring, count) in order of first occurrence
        let mut counts: Vec<(&str, usize)> = Vec::new();

        for m in rule.regex().find_iter(text) {
            if m.as_str().is_empty() || is_excluded(rule, text, m.end()) {
                continue;
            }
            if rule.position() == PositionConstraint::NonInitial && is_sentence_initial(text, m.start()) {
                continue;
            }
            match counts.iter_mut().find(|(s, _)| *s == m.as_str()) {
                Some((_, count)) => *count += 1,
                None => counts.push((m.as_str(), 1)),
            }
        }

        findings.extend(counts.into_iter().map(|(matched, count)| {
            (
                rule,
                Finding {
                    pattern_id: rule.id().to_string(),
                    matched_substring: matched.to_string(),
                    occurrence_count: count,
                },
            )
        }));
    }

    findings
}

/// Find suspected untranslated fragments in `text`
///
/// Findings are deduplicated by `(pattern_id, matched_substring)` and come
/// out in rule order, then in order of first occurrence.
pub fn detect_untranslated(text: &str, rules: &RuleSet) -> Vec<Finding> {
    detect_with_rules(text, rules)
        .into_iter()
        .map(|(_, finding)| finding)
        .collect()
}

fn question_fields(question: &Question) -> Vec<(Field, &str)> {
    let mut fields = vec![(Field::Question, question.prompt.as_str())];

    for (index, answer) in question.correct_answers.iter().enumerate() {
        fields.push((Field::CorrectAnswer { index, part: AnswerPart::Text }, answer.text.as_str()));
        fields.push((Field::CorrectAnswer { index, part: AnswerPart::Rationale }, answer.rationale.as_str()));
    }
    for (index, answer) in question.wrong_answers.iter().enumerate() {
        fields.push((Field::WrongAnswer { index, part: AnswerPart::Text }, answer.text.as_str()));
        fields.push((Field::WrongAnswer { index, part: AnswerPart::Rationale }, answer.rationale.as_str()));
    }

    fields
}

/// Run the detector over every text field of a question
pub fn scan_question(question: &Question, rules: &RuleSet) -> Vec<LanguageFinding> {
    question_fields(question)
        .into_iter()
        .flat_map(|(field, text)| {
            detect_with_rules(text, rules)
                .into_iter()
                .map(move |(rule, finding)| LanguageFinding {
                    field,
                    finding,
                    category: rule.category(),
                    weight: rule.weight(),
                })
        })
        .collect()
}

/// Scan a whole bank; ids without findings are left out
pub fn scan_bank(bank: &QuestionBank, rules: &RuleSet) -> BTreeMap<u32, Vec<LanguageFinding>> {
    bank.iter()
        .filter_map(|question| {
            let findings = scan_question(question, rules);
            (!findings.is_empty()).then_some((question.id, findings))
        })
        .collect()
}
