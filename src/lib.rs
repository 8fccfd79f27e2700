//! bankcheck - consistency checks for localized question banks
//!
//! A localized bank is compared against its canonical counterpart:
//! structural parity (ids, answer counts) and heuristic detection of
//! untranslated fragments, aggregated into a serializable report.

rust_i18n::i18n!("locales", fallback = "en");

pub mod bank;
pub mod check;
pub mod compare;
pub mod detect;
pub mod i18n;
pub mod options;
pub mod report;
pub mod rules;
