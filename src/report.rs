//! Aggregated check results
//!
//! The report is a plain value: serializing the same inputs twice produces
//! byte-identical JSON.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::compare::{StructuralFinding, StructuralReport};
use crate::detect::LanguageFinding;

/// Everything found for one id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub id: u32,
    pub structural: Vec<StructuralFinding>,
    pub language: Vec<LanguageFinding>,
    /// Sum of weighted language finding occurrences
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localized_language: Option<String>,
    pub total_entries: usize,
    pub entries_with_structural_issues: usize,
    pub entries_with_language_issues: usize,
    pub total_findings: usize,
    pub language_score: f64,
    /// Entries with at least one finding, by ascending id
    pub entries: Vec<EntryReport>,
}

impl Report {
    pub fn with_languages(mut self, canonical: Option<String>, localized: Option<String>) -> Self {
        self.canonical_language = canonical;
        self.localized_language = localized;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.total_findings == 0
    }

    pub fn entry(&self, id: u32) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Aggregate structural and language findings
///
/// `total_entries` only knows the ids that have findings; use
/// [`build_report_with_ids`] to count clean entries too.
pub fn build_report(
    structural: &StructuralReport,
    per_entry: &BTreeMap<u32, Vec<LanguageFinding>>,
) -> Report {
    build_report_with_ids(std::iter::empty(), structural, per_entry)
}

/// Aggregate findings, counting every id in `entry_ids` as an entry
pub fn build_report_with_ids(
    entry_ids: impl IntoIterator<Item = u32>,
    structural: &StructuralReport,
    per_entry: &BTreeMap<u32, Vec<LanguageFinding>>,
) -> Report {
    let mut all_ids: BTreeSet<u32> = entry_ids.into_iter().collect();
    all_ids.extend(structural.ids());
    all_ids.extend(per_entry.keys().copied());

    let mut entries = Vec::new();
    let mut entries_with_structural_issues = 0;
    let mut entries_with_language_issues = 0;
    let mut total_findings = 0;
    let mut language_score = 0.0;

    for &id in &all_ids {
        let structural_findings: Vec<StructuralFinding> = structural.for_id(id).cloned().collect();

        let mut language = per_entry.get(&id).cloned().unwrap_or_default();
        language.sort_by(|a, b| {
            a.field
                .cmp(&b.field)
                .then_with(|| a.finding.pattern_id.cmp(&b.finding.pattern_id))
                .then_with(|| a.finding.matched_substring.cmp(&b.finding.matched_substring))
        });

        if structural_findings.is_empty() && language.is_empty() {
            continue;
        }
        if !structural_findings.is_empty() {
            entries_with_structural_issues += 1;
        }
        if !language.is_empty() {
            entries_with_language_issues += 1;
        }

        let score: f64 = language.iter().map(LanguageFinding::score).sum();
        total_findings += structural_findings.len() + language.len();
        language_score += score;

        entries.push(EntryReport {
            id,
            structural: structural_findings,
            language,
            score,
        });
    }

    Report {
        canonical_language: None,
        localized_language: None,
        total_entries: all_ids.len(),
        entries_with_structural_issues,
        entries_with_language_issues,
        total_findings,
        language_score,
        entries,
    }
}
