//! Question bank model and schema loader
//!
//! A question bank is the JSON document the app ships per language
//! (`interview_questions_<lang>.json`). This module turns raw bytes into a
//! validated [`QuestionBank`], rejecting malformed documents with the path of
//! the offending field:
//! - Bare array of questions, or `{ "language": .., "questions": [..] }`
//! - Unique, non-negative integer ids
//! - At least one correct answer per question in the canonical bank
//!
//! A localized bank may empty an answer array: that is a structural finding
//! for the comparator, not a load failure.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Path used for errors concerning the document root
const ROOT_PATH: &str = "$";

/// One answer option with its explanation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub rationale: String,
}

impl Answer {
    pub fn new(text: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rationale: rationale.into(),
        }
    }
}

/// A single interview question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Join key across languages
    pub id: u32,
    /// The `question` field
    pub prompt: String,
    pub correct_answers: Vec<Answer>,
    pub wrong_answers: Vec<Answer>,
}

/// An ordered, language-tagged sequence of questions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    pub language: Option<String>,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(language: Option<String>, questions: Vec<Question>) -> Self {
        Self { language, questions }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.questions.iter().map(|q| q.id)
    }
}

/// Which side of a comparison a bank is loaded for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankRole {
    /// Reference bank: every question needs a correct answer
    #[default]
    Canonical,
    /// Translation: emptied answer arrays are accepted
    Localized,
}

/// What went wrong at a given location of the document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaErrorKind {
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("missing required field")]
    MissingField,
    #[error("expected {expected}")]
    WrongType { expected: &'static str },
    #[error("must contain at least one answer")]
    EmptyAnswers,
    #[error("duplicate id {0}")]
    DuplicateId(u32),
}

/// A malformed question bank, with the path of the offending field
/// (e.g. `$[3].correctAnswers[1].text`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct SchemaError {
    pub path: String,
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    fn at(path: &FieldPath, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }
}

/// JSON-path-like location used while walking the document
#[derive(Debug, Clone)]
struct FieldPath(String);

impl FieldPath {
    fn root() -> Self {
        Self(ROOT_PATH.to_string())
    }

    fn key(&self, key: &str) -> Self {
        Self(format!("{}.{}", self.0, key))
    }

    fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load and validate a canonical question bank from raw bytes
///
/// The caller is responsible for reading the bytes; nothing here touches the
/// filesystem.
pub fn load(raw: &[u8]) -> Result<QuestionBank, SchemaError> {
    load_as(raw, BankRole::Canonical)
}

/// Load a localized bank: like [`load`], but an empty `correctAnswers` is
/// kept so the comparator can report it
pub fn load_localized(raw: &[u8]) -> Result<QuestionBank, SchemaError> {
    load_as(raw, BankRole::Localized)
}

pub fn load_as(raw: &[u8], role: BankRole) -> Result<QuestionBank, SchemaError> {
    let root = FieldPath::root();

    let text = std::str::from_utf8(raw)
        .map_err(|_| SchemaError::at(&root, SchemaErrorKind::InvalidUtf8))?;
    // Files saved by some editors carry a byte order mark
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let document: Value = serde_json::from_str(text)
        .map_err(|e| SchemaError::at(&root, SchemaErrorKind::InvalidJson(e.to_string())))?;

    match document {
        Value::Array(items) => Ok(QuestionBank::new(None, parse_questions(&items, &root, role)?)),
        Value::Object(map) => {
            let language = match map.get("language") {
                None | Some(Value::Null) => None,
                Some(Value::String(tag)) => Some(tag.clone()),
                Some(_) => {
                    return Err(SchemaError::at(
                        &root.key("language"),
                        SchemaErrorKind::WrongType { expected: "a string" },
                    ))
                }
            };
            let path = root.key("questions");
            let items = match map.get("questions") {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(SchemaError::at(
                        &path,
                        SchemaErrorKind::WrongType { expected: "an array" },
                    ))
                }
                None => return Err(SchemaError::at(&path, SchemaErrorKind::MissingField)),
            };
            Ok(QuestionBank::new(language, parse_questions(items, &path, role)?))
        }
        _ => Err(SchemaError::at(
            &root,
            SchemaErrorKind::WrongType {
                expected: "an array of questions or an object with a `questions` array",
            },
        )),
    }
}

fn parse_questions(items: &[Value], path: &FieldPath, role: BankRole) -> Result<Vec<Question>, SchemaError> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut questions = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let item_path = path.index(index);
        let question = parse_question(item, &item_path, role)?;
        if !seen.insert(question.id) {
            return Err(SchemaError::at(
                &item_path.key("id"),
                SchemaErrorKind::DuplicateId(question.id),
            ));
        }
        questions.push(question);
    }

    Ok(questions)
}

fn parse_question(item: &Value, path: &FieldPath, role: BankRole) -> Result<Question, SchemaError> {
    let map = as_object(item, path)?;

    let id_path = path.key("id");
    let id = required(map, "id", path)?
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| {
            SchemaError::at(
                &id_path,
                SchemaErrorKind::WrongType {
                    expected: "a non-negative integer",
                },
            )
        })?;

    let prompt = required_string(map, "question", path)?;

    let correct_path = path.key("correctAnswers");
    let correct_answers = parse_answers(required(map, "correctAnswers", path)?, &correct_path)?;
    if correct_answers.is_empty() && role == BankRole::Canonical {
        return Err(SchemaError::at(&correct_path, SchemaErrorKind::EmptyAnswers));
    }

    let wrong_answers = parse_answers(
        required(map, "wrongAnswers", path)?,
        &path.key("wrongAnswers"),
    )?;

    Ok(Question {
        id,
        prompt,
        correct_answers,
        wrong_answers,
    })
}

fn parse_answers(value: &Value, path: &FieldPath) -> Result<Vec<Answer>, SchemaError> {
    let items = value.as_array().ok_or_else(|| {
        SchemaError::at(path, SchemaErrorKind::WrongType { expected: "an array" })
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let item_path = path.index(index);
            let map = as_object(item, &item_path)?;
            Ok(Answer {
                text: required_string(map, "text", &item_path)?,
                rationale: required_string(map, "rationale", &item_path)?,
            })
        })
        .collect()
}

fn as_object<'a>(value: &'a Value, path: &FieldPath) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| {
        SchemaError::at(path, SchemaErrorKind::WrongType { expected: "an object" })
    })
}

fn required<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    path: &FieldPath,
) -> Result<&'a Value, SchemaError> {
    map.get(key)
        .ok_or_else(|| SchemaError::at(&path.key(key), SchemaErrorKind::MissingField))
}

fn required_string(
    map: &Map<String, Value>,
    key: &str,
    path: &FieldPath,
) -> Result<String, SchemaError> {
    required(map, key, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::at(&path.key(key), SchemaErrorKind::WrongType { expected: "a string" }))
}

/// Infer a language tag from a `<name>_<lang>.json` file name
///
/// `interview_questions_es.json` -> `es`, `questions_zh-TW.json` -> `zh-TW`.
pub fn language_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, tag) = stem.rsplit_once('_')?;

    let mut parts = tag.split('-');
    let primary = parts.next()?;
    let primary_ok = (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase());
    let rest_ok = parts.all(|p| !p.is_empty() && p.len() <= 8 && p.chars().all(|c| c.is_ascii_alphanumeric()));

    if primary_ok && rest_ok {
        Some(tag.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"[
        {"id": 1, "question": "Q1",
         "correctAnswers": [{"text": "A", "rationale": "R"}],
         "wrongAnswers": []}
    ]"#;

    fn error_of(raw: &str) -> SchemaError {
        load(raw.as_bytes()).unwrap_err()
    }

    #[test]
    fn test_load_bare_array() {
        let bank = load(MINIMAL.as_bytes()).unwrap();
        assert_eq!(bank.language, None);
        assert_eq!(bank.len(), 1);
        let q = bank.get(1).unwrap();
        assert_eq!(q.prompt, "Q1");
        assert_eq!(q.correct_answers, vec![Answer::new("A", "R")]);
        assert!(q.wrong_answers.is_empty());
    }

    #[test]
    fn test_load_tagged_object() {
        let raw = format!(r#"{{"language": "es", "questions": {}}}"#, MINIMAL);
        let bank = load(raw.as_bytes()).unwrap();
        assert_eq!(bank.language.as_deref(), Some("es"));
        assert_eq!(bank.ids().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_load_strips_bom_and_ignores_unknown_keys() {
        let raw = "\u{feff}[{\"id\": 7, \"question\": \"Q\", \"category\": \"history\", \
                   \"correctAnswers\": [{\"text\": \"A\", \"rationale\": \"R\", \"text_ko\": \"가\"}], \
                   \"wrongAnswers\": []}]";
        let bank = load(raw.as_bytes()).unwrap();
        assert_eq!(bank.ids().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = load(&[0x5b, 0xff, 0x5d]).unwrap_err();
        assert_eq!(err.kind, SchemaErrorKind::InvalidUtf8);
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_invalid_json() {
        let err = error_of("[{");
        assert!(matches!(err.kind, SchemaErrorKind::InvalidJson(_)));
    }

    #[test]
    fn test_root_wrong_type() {
        let err = error_of("42");
        assert_eq!(err.path, "$");
        assert!(matches!(err.kind, SchemaErrorKind::WrongType { .. }));
    }

    #[test]
    fn test_missing_questions_key() {
        let err = error_of(r#"{"language": "ko"}"#);
        assert_eq!(err.path, "$.questions");
        assert_eq!(err.kind, SchemaErrorKind::MissingField);
    }

    #[test]
    fn test_id_not_integer() {
        let err = error_of(
            r#"[{"id": "1", "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}], "wrongAnswers": []}]"#,
        );
        assert_eq!(err.path, "$[0].id");
        assert!(matches!(err.kind, SchemaErrorKind::WrongType { .. }));

        let err = error_of(
            r#"[{"id": -3, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}], "wrongAnswers": []}]"#,
        );
        assert_eq!(err.path, "$[0].id");
    }

    #[test]
    fn test_correct_answers_not_array() {
        let err = error_of(
            r#"[{"id": 1, "question": "Q", "correctAnswers": "A", "wrongAnswers": []}]"#,
        );
        assert_eq!(err.path, "$[0].correctAnswers");
        assert_eq!(err.kind, SchemaErrorKind::WrongType { expected: "an array" });
    }

    #[test]
    fn test_nested_field_path() {
        let err = error_of(
            r#"[{"id": 1, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}], "wrongAnswers": []},
                {"id": 2, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}, {"rationale": "R"}], "wrongAnswers": []}]"#,
        );
        assert_eq!(err.path, "$[1].correctAnswers[1].text");
        assert_eq!(err.kind, SchemaErrorKind::MissingField);
        assert_eq!(err.to_string(), "$[1].correctAnswers[1].text: missing required field");
    }

    #[test]
    fn test_missing_wrong_answers() {
        let err = error_of(
            r#"[{"id": 1, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}]}]"#,
        );
        assert_eq!(err.path, "$[0].wrongAnswers");
        assert_eq!(err.kind, SchemaErrorKind::MissingField);
    }

    #[test]
    fn test_empty_correct_answers() {
        let err = error_of(r#"[{"id": 1, "question": "Q", "correctAnswers": [], "wrongAnswers": []}]"#);
        assert_eq!(err.path, "$[0].correctAnswers");
        assert_eq!(err.kind, SchemaErrorKind::EmptyAnswers);
    }

    #[test]
    fn test_localized_bank_may_empty_correct_answers() {
        let raw = r#"[
            {"id": 1, "question": "Q", "correctAnswers": [], "wrongAnswers": []},
            {"id": 2, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}], "wrongAnswers": []}
        ]"#;
        let bank = load_localized(raw.as_bytes()).unwrap();
        assert_eq!(bank.len(), 2);
        assert!(bank.get(1).unwrap().correct_answers.is_empty());

        // Shape errors are still fatal
        let err = load_localized(br#"[{"id": 1, "question": "Q", "correctAnswers": "A", "wrongAnswers": []}]"#)
            .unwrap_err();
        assert_eq!(err.path, "$[0].correctAnswers");
    }

    #[test]
    fn test_duplicate_id_points_at_second_occurrence() {
        let one = r#"{"id": 4, "question": "Q", "correctAnswers": [{"text": "A", "rationale": "R"}], "wrongAnswers": []}"#;
        let err = error_of(&format!("[{one}, {one}]"));
        assert_eq!(err.path, "$[1].id");
        assert_eq!(err.kind, SchemaErrorKind::DuplicateId(4));
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(
            language_from_path(Path::new("data/interview_questions_es.json")).as_deref(),
            Some("es")
        );
        assert_eq!(
            language_from_path(Path::new("questions_zh-TW.json")).as_deref(),
            Some("zh-TW")
        );
        assert_eq!(language_from_path(Path::new("questions.json")), None);
        assert_eq!(language_from_path(Path::new("interview_questions_final.json")), None);
    }
}
