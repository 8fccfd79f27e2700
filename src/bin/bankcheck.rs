//! bankcheck - Check localized question banks against the canonical bank
//!
//! `check` reports structural defects and suspected untranslated text,
//! `rules` validates and lists a rule set.
//!
//! `--localized` may be repeated; each localized bank gets its own report.
//!
//! Exit codes: 0 when nothing was found, 1 when any report has findings,
//! 2 when an input could not be loaded.

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rust_i18n::t;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bankcheck::check::{self, CheckOptions, Reports};
use bankcheck::i18n::init_locale;
use bankcheck::report::Report;
use bankcheck::rules::{PositionConstraint, RuleSet};

rust_i18n::i18n!("locales", fallback = "en");

const EXIT_FINDINGS: u8 = 1;
const EXIT_FAILURE: u8 = 2;

fn build_cli() -> Command {
    Command::new("bankcheck")
        .about(t!("help.about").to_string())
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("help.lang").to_string())
                .value_name("LOCALE")
                .global(true)
        )
        .subcommand(
            Command::new("check")
                .about(t!("help.check.about").to_string())
                .arg(
                    Arg::new("canonical")
                        .long("canonical")
                        .short('c')
                        .help(t!("help.check.canonical").to_string())
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .required(true)
                )
                .arg(
                    Arg::new("localized")
                        .long("localized")
                        .short('l')
                        .help(t!("help.check.localized").to_string())
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .num_args(1..)
                        .action(ArgAction::Append)
                        .required(true)
                )
                .arg(
                    Arg::new("rules")
                        .long("rules")
                        .short('r')
                        .help(t!("help.check.rules").to_string())
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .short('o')
                        .help(t!("help.check.out").to_string())
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                )
                .arg(
                    Arg::new("check_options")
                        .long("check-options")
                        .help(t!("help.check.check_options").to_string())
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("canonical_lang")
                        .long("canonical-lang")
                        .help(t!("help.check.canonical_lang").to_string())
                        .value_name("TAG")
                )
                .arg(
                    Arg::new("localized_lang")
                        .long("localized-lang")
                        .help(t!("help.check.localized_lang").to_string())
                        .value_name("TAG")
                ),
        )
        .subcommand(
            Command::new("rules")
                .about(t!("help.rules.about").to_string())
                .arg(
                    Arg::new("rules")
                        .long("rules")
                        .short('r')
                        .help(t!("help.rules.rules").to_string())
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                ),
        )
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn required_path(matches: &ArgMatches, name: &str) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .ok_or_else(|| anyhow!("{}", t!("errors.missing_argument", name = name)))
}

fn print_summary(out: &mut dyn Write, canonical: &Path, localized: &str, report: &Report) -> Result<()> {
    writeln!(
        out,
        "{}",
        t!(
            "check.summary_header",
            localized = localized,
            canonical = canonical.display().to_string()
        )
    )?;
    writeln!(out, "{}", t!("check.total_entries", count = report.total_entries))?;
    writeln!(
        out,
        "{}",
        t!("check.structural_issues", count = report.entries_with_structural_issues)
    )?;
    writeln!(
        out,
        "{}",
        t!("check.language_issues", count = report.entries_with_language_issues)
    )?;
    writeln!(out, "{}", t!("check.total_findings", count = report.total_findings))?;
    if report.is_clean() {
        writeln!(out, "{}", t!("check.clean"))?;
    }
    Ok(())
}

fn print_summaries(out: &mut dyn Write, canonical: &Path, reports: &Reports) -> Result<()> {
    for (localized, report) in reports {
        print_summary(out, canonical, localized, report)?;
    }
    Ok(())
}

/// A single bank prints its report as is; several print an object keyed by
/// language
fn reports_to_json(reports: &Reports) -> serde_json::Result<String> {
    match reports.values().next() {
        Some(report) if reports.len() == 1 => report.to_json_pretty(),
        _ => serde_json::to_string_pretty(reports),
    }
}

fn run_check(matches: &ArgMatches) -> Result<ExitCode> {
    let localized: Vec<PathBuf> = matches
        .get_many::<PathBuf>("localized")
        .map(|paths| paths.cloned().collect())
        .unwrap_or_default();
    if localized.is_empty() {
        return Err(anyhow!("{}", t!("errors.missing_argument", name = "localized")));
    }

    let options = CheckOptions {
        canonical: required_path(matches, "canonical")?,
        localized,
        rules: matches.get_one::<PathBuf>("rules").cloned(),
        check_options: matches.get_flag("check_options"),
        canonical_language: matches.get_one::<String>("canonical_lang").cloned(),
        localized_language: matches.get_one::<String>("localized_lang").cloned(),
    };

    let reports = check::run(&options)?;
    let json = reports_to_json(&reports).context(t!("errors.failed_serialize_report").to_string())?;

    match matches.get_one::<PathBuf>("out") {
        Some(out) => {
            fs::write(out, format!("{}\n", json)).context(
                t!("errors.failed_write_report", path = out.display().to_string()).to_string(),
            )?;
            let mut stdout = std::io::stdout().lock();
            print_summaries(&mut stdout, &options.canonical, &reports)?;
            writeln!(stdout, "{}", t!("check.report_written", path = out.display().to_string()))?;
        }
        None => {
            // Keep stdout pure JSON
            print_summaries(&mut std::io::stderr().lock(), &options.canonical, &reports)?;
            println!("{}", json);
        }
    }

    Ok(if reports.values().all(Report::is_clean) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FINDINGS)
    })
}

fn describe_rules(rules: &RuleSet, source: &str) {
    println!("{}", t!("rules.header", count = rules.len(), source = source));
    for rule in rules {
        let mut notes = Vec::new();
        if rule.position() == PositionConstraint::NonInitial {
            notes.push(t!("rules.non_initial").to_string());
        }
        if !rule.exclusions().is_empty() {
            notes.push(t!("rules.excludes", words = rule.exclusions().join(", ")).to_string());
        }
        println!(
            "  {:<22} {:<14} {:<6} {:>5.2}  {}",
            rule.id(),
            rule.category().as_str(),
            rule.language(),
            rule.weight(),
            notes.join("; ")
        );
    }
}

fn run_rules(matches: &ArgMatches) -> Result<ExitCode> {
    let path = matches.get_one::<PathBuf>("rules");
    let rules = check::load_rules(path.map(PathBuf::as_path))?;

    let source = match path {
        Some(path) => path.display().to_string(),
        None => t!("rules.builtin").to_string(),
    };
    describe_rules(&rules, &source);

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();

    // Initialize locale from the system so help text is localized
    init_locale(None);

    let matches = build_cli().get_matches();
    let lang = matches
        .subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>("lang"))
        .or_else(|| matches.get_one::<String>("lang"));
    if let Some(lang) = lang {
        init_locale(Some(lang.as_str()));
    }

    let outcome = match matches.subcommand() {
        Some(("check", sub)) => run_check(sub),
        Some(("rules", sub)) => run_rules(sub),
        _ => Err(anyhow!("{}", t!("errors.unknown_command"))),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", t!("errors.prefix"), e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
