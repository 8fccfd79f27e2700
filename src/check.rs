//! End-to-end check of localized banks against their canonical source
//!
//! This is the only place that touches the filesystem: the loader, the
//! comparator and the detector all work on values.

use anyhow::{bail, Context, Result};
use rust_i18n::t;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bank::{self, BankRole, QuestionBank};
use crate::compare::compare;
use crate::detect::scan_bank;
use crate::options::OptionCounter;
use crate::report::{build_report_with_ids, Report};
use crate::rules::{RuleFormat, RuleSet};

/// Inputs of a `check` run
#[derive(Debug, Default, Clone)]
pub struct CheckOptions {
    pub canonical: PathBuf,
    /// Every localized bank gets its own report
    pub localized: Vec<PathBuf>,
    /// Rule file; the built-in English rules when `None`
    pub rules: Option<PathBuf>,
    /// Also compare option counts of wrong answers
    pub check_options: bool,
    pub canonical_language: Option<String>,
    /// Only valid with a single localized bank
    pub localized_language: Option<String>,
}

/// Reports keyed by localized language tag, or by file stem when a bank
/// has no tag
pub type Reports = BTreeMap<String, Report>;

/// Read and validate a question bank file
///
/// The language tag comes from `language`, then the document, then the
/// file name.
pub fn load_bank_file(path: &Path, language: Option<&str>, role: BankRole) -> Result<QuestionBank> {
    let raw = fs::read(path)
        .context(t!("errors.failed_read_file", path = path.display().to_string()).to_string())?;

    let mut loaded = bank::load_as(&raw, role)
        .context(t!("errors.invalid_bank", path = path.display().to_string()).to_string())?;

    loaded.language = language
        .map(str::to_string)
        .or(loaded.language)
        .or_else(|| bank::language_from_path(path));

    debug!(
        path = %path.display(),
        questions = loaded.len(),
        language = ?loaded.language,
        ?role,
        "loaded question bank"
    );

    Ok(loaded)
}

/// Load a rule file, or the built-in rules when `path` is `None`
pub fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    let rules = match path {
        Some(path) => {
            let raw = fs::read(path)
                .context(t!("errors.failed_read_file", path = path.display().to_string()).to_string())?;
            RuleSet::parse(&raw, RuleFormat::from_path(path))
                .context(t!("errors.invalid_rules", path = path.display().to_string()).to_string())?
        }
        None => RuleSet::builtin().context(t!("errors.invalid_builtin_rules").to_string())?,
    };

    if rules.is_empty() {
        warn!("rule set is empty, no language findings will be reported");
    }

    Ok(rules)
}

/// Compare, optionally count options, scan and aggregate
pub fn run_on_banks(
    canonical: &QuestionBank,
    localized: &QuestionBank,
    rules: &RuleSet,
    option_counter: Option<&OptionCounter>,
) -> Report {
    let mut structural = compare(canonical, localized);
    if let Some(counter) = option_counter {
        structural.extend(counter.check_option_counts(localized));
    }

    let language = scan_bank(localized, rules);

    let entry_ids = canonical.ids().chain(localized.ids());
    let report = build_report_with_ids(entry_ids, &structural, &language)
        .with_languages(canonical.language.clone(), localized.language.clone());

    info!(
        localized = ?report.localized_language,
        entries = report.total_entries,
        structural = report.entries_with_structural_issues,
        language = report.entries_with_language_issues,
        findings = report.total_findings,
        "check finished"
    );

    report
}

fn report_key(localized: &QuestionBank, path: &Path) -> String {
    localized
        .language
        .clone()
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_else(|| path.display().to_string())
}

/// Run a full check from files, one report per localized bank
pub fn run(options: &CheckOptions) -> Result<Reports> {
    if options.localized_language.is_some() && options.localized.len() > 1 {
        bail!("{}", t!("errors.localized_lang_needs_single"));
    }

    let canonical = load_bank_file(
        &options.canonical,
        options.canonical_language.as_deref(),
        BankRole::Canonical,
    )?;
    let rules = load_rules(options.rules.as_deref())?;

    if let (Some(expected), Some(actual)) = (rules.language(), canonical.language.as_deref()) {
        if !same_language(expected, actual) {
            warn!(
                rules = expected,
                canonical = actual,
                "rule set targets a different language than the canonical bank"
            );
        }
    }

    let option_counter = if options.check_options {
        Some(OptionCounter::new().context(t!("errors.invalid_option_patterns").to_string())?)
    } else {
        None
    };

    let mut reports = Reports::new();
    for path in &options.localized {
        let localized = load_bank_file(path, options.localized_language.as_deref(), BankRole::Localized)?;
        let key = report_key(&localized, path);
        if reports.contains_key(&key) {
            bail!(
                "{}",
                t!("errors.duplicate_localized", key = key, path = path.display().to_string())
            );
        }
        let report = run_on_banks(&canonical, &localized, &rules, option_counter.as_ref());
        reports.insert(key, report);
    }

    Ok(reports)
}

/// Compare primary subtags: `en-US` and `en` are the same language
fn same_language(a: &str, b: &str) -> bool {
    let primary = |tag: &str| tag.split(['-', '_']).next().unwrap_or(tag).to_ascii_lowercase();
    primary(a) == primary(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Answer, Question};

    fn question(id: u32, prompt: &str, correct: &[(&str, &str)], wrong: &[(&str, &str)]) -> Question {
        Question {
            id,
            prompt: prompt.to_string(),
            correct_answers: correct.iter().map(|(t, r)| Answer::new(*t, *r)).collect(),
            wrong_answers: wrong.iter().map(|(t, r)| Answer::new(*t, *r)).collect(),
        }
    }

    #[test]
    fn test_translated_bank_is_clean() {
        let canonical = QuestionBank::new(
            Some("en".to_string()),
            vec![question(1, "Q1", &[("A", "R")], &[])],
        );
        let localized = QuestionBank::new(
            Some("es".to_string()),
            vec![question(1, "Q1 fue traducido", &[("A1", "R1")], &[])],
        );
        let rules = RuleSet::builtin().unwrap();

        let report = run_on_banks(&canonical, &localized, &rules, None);
        assert!(report.is_clean());
        assert_eq!(report.total_entries, 1);
        assert_eq!(report.canonical_language.as_deref(), Some("en"));
        assert_eq!(report.localized_language.as_deref(), Some("es"));
    }

    #[test]
    fn test_option_counts_are_opt_in() {
        let make_bank = |wrong: &str| {
            QuestionBank::new(
                None,
                vec![question(
                    4,
                    "Nombra dos derechos",
                    &[("expresión", "R"), ("religión", "R")],
                    &[(wrong, "R")],
                )],
            )
        };
        let canonical = make_bank("to vote, to drive");
        let localized = make_bank("conducir");
        let rules = RuleSet::default();

        assert!(run_on_banks(&canonical, &localized, &rules, None).is_clean());

        let counter = OptionCounter::new().unwrap();
        let report = run_on_banks(&canonical, &localized, &rules, Some(&counter));
        assert_eq!(report.total_findings, 1);
        assert_eq!(report.entries_with_structural_issues, 1);
    }

    #[test]
    fn test_report_key() {
        let tagged = QuestionBank::new(Some("ko".to_string()), vec![]);
        let untagged = QuestionBank::default();
        assert_eq!(report_key(&tagged, Path::new("data/questions.json")), "ko");
        assert_eq!(report_key(&untagged, Path::new("data/questions.json")), "questions");
    }

    #[test]
    fn test_same_language() {
        assert!(same_language("en-US", "en"));
        assert!(same_language("es_MX", "ES"));
        assert!(!same_language("en", "es"));
    }
}
