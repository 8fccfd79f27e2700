//! Declarative rule sets for the language detector
//!
//! A rule set is data, not code: every rule names a pattern, the category of
//! word it matches, and the exceptions that keep it from firing on loanwords
//! shared between languages. Rule files are JSON or TOML:
//!
//! ```json
//! { "language": "en",
//!   "rules": [ { "id": "a", "pattern": "a", "category": "article",
//!                "caseSensitive": true, "excludeFollowedBy": ["tribu"] } ] }
//! ```
//!
//! A bare JSON array of rules is accepted as well.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Rules shipped with the binary, used when no rule file is given
const BUILTIN_RULES: &str = include_str!("../rules/en.json");

/// Language assumed for rules that do not name one
const DEFAULT_RULE_LANGUAGE: &str = "en";

/// Word class a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Preposition,
    AuxiliaryVerb,
    Article,
    Conjunction,
    Interrogative,
    /// Demonstratives and subject pronouns that open a sentence ("This", "It")
    Pronoun,
    DomainNoun,
    /// Placeholder left behind by a translation pass, e.g. `[Traducción necesaria]`
    Marker,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Preposition => "preposition",
            Category::AuxiliaryVerb => "auxiliaryVerb",
            Category::Article => "article",
            Category::Conjunction => "conjunction",
            Category::Interrogative => "interrogative",
            Category::Pronoun => "pronoun",
            Category::DomainNoun => "domainNoun",
            Category::Marker => "marker",
        }
    }

    /// Markers are delimited by punctuation, so `\b` anchors would never match
    fn is_word_anchored(&self) -> bool {
        !matches!(self, Category::Marker)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in a sentence a match may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionConstraint {
    #[default]
    Any,
    /// Ignore matches at the start of a sentence
    NonInitial,
}

fn default_weight() -> f64 {
    1.0
}

/// One rule as written in a rule file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub id: String,
    pub pattern: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_followed_by: Vec<String>,
    #[serde(default, rename = "positionConstraint")]
    pub position: PositionConstraint,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl RuleSpec {
    pub fn new(id: impl Into<String>, pattern: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            category,
            language: None,
            exclude_followed_by: Vec::new(),
            position: PositionConstraint::Any,
            case_sensitive: false,
            weight: default_weight(),
        }
    }

    pub fn excluding<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_followed_by.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn non_initial(mut self) -> Self {
        self.position = PositionConstraint::NonInitial;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Rule file layout with an optional set-wide language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Encoding of a rule file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Json,
    Toml,
}

impl RuleFormat {
    /// `.toml` files are TOML, everything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => RuleFormat::Toml,
            _ => RuleFormat::Json,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid rule document: {0}")]
    Document(String),
    #[error("rule #{index} has an empty id")]
    EmptyId { index: usize },
    #[error("rule `{id}` has an empty pattern")]
    EmptyPattern { id: String },
    #[error("duplicate rule id `{id}`")]
    DuplicateId { id: String },
    #[error("rule `{id}` has an invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule `{id}` must have a positive weight, got {weight}")]
    InvalidWeight { id: String, weight: f64 },
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    pattern: String,
    category: Category,
    language: String,
    regex: Regex,
    exclusions: Vec<String>,
    position: PositionConstraint,
    weight: f64,
}

impl Rule {
    fn compile(spec: RuleSpec, set_language: Option<&str>) -> Result<Self, RuleError> {
        if spec.pattern.trim().is_empty() {
            return Err(RuleError::EmptyPattern { id: spec.id });
        }
        if !(spec.weight.is_finite() && spec.weight > 0.0) {
            return Err(RuleError::InvalidWeight {
                id: spec.id,
                weight: spec.weight,
            });
        }

        let source = if spec.category.is_word_anchored() {
            format!(r"\b(?:{})\b", spec.pattern)
        } else {
            spec.pattern.clone()
        };
        let regex = match RegexBuilder::new(&source)
            .case_insensitive(!spec.case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(source) => return Err(RuleError::InvalidPattern { id: spec.id, source }),
        };

        let language = spec
            .language
            .or_else(|| set_language.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_RULE_LANGUAGE.to_string());

        let exclusions = spec
            .exclude_followed_by
            .iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();

        Ok(Self {
            id: spec.id,
            pattern: spec.pattern,
            category: spec.category,
            language,
            regex,
            exclusions,
            position: spec.position,
            weight: spec.weight,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Pattern as written, before anchoring
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Lowercased words that suppress a match when they follow it
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn position(&self) -> PositionConstraint {
        self.position
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// An ordered, immutable collection of compiled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    language: Option<String>,
    rules: Vec<Rule>,
    by_id: HashMap<String, usize>,
}

impl RuleSet {
    /// Compile rule specs, keeping their order
    pub fn from_specs(language: Option<String>, specs: Vec<RuleSpec>) -> Result<Self, RuleError> {
        let mut rules = Vec::with_capacity(specs.len());
        let mut by_id = HashMap::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            if spec.id.trim().is_empty() {
                return Err(RuleError::EmptyId { index });
            }
            if by_id.contains_key(&spec.id) {
                return Err(RuleError::DuplicateId { id: spec.id });
            }
            let rule = Rule::compile(spec, language.as_deref())?;
            by_id.insert(rule.id.clone(), rules.len());
            rules.push(rule);
        }

        debug!(rules = rules.len(), language = ?language, "compiled rule set");

        Ok(Self {
            language,
            rules,
            by_id,
        })
    }

    pub fn from_file(file: RuleFile) -> Result<Self, RuleError> {
        Self::from_specs(file.language, file.rules)
    }

    /// Parse a rule document in the given format
    pub fn parse(raw: &[u8], format: RuleFormat) -> Result<Self, RuleError> {
        let text = std::str::from_utf8(raw).map_err(|e| RuleError::Document(e.to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let file = match format {
            RuleFormat::Json => {
                let value: serde_json::Value =
                    serde_json::from_str(text).map_err(|e| RuleError::Document(e.to_string()))?;
                if value.is_array() {
                    RuleFile {
                        language: None,
                        rules: serde_json::from_value(value)
                            .map_err(|e| RuleError::Document(e.to_string()))?,
                    }
                } else {
                    serde_json::from_value(value).map_err(|e| RuleError::Document(e.to_string()))?
                }
            }
            RuleFormat::Toml => {
                toml::from_str(text).map_err(|e| RuleError::Document(e.to_string()))?
            }
        };

        Self::from_file(file)
    }

    /// English leftover rules shipped with the tool
    pub fn builtin() -> Result<Self, RuleError> {
        Self::parse(BUILTIN_RULES.as_bytes(), RuleFormat::Json)
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.by_id.get(id).map(|&index| &self.rules[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
