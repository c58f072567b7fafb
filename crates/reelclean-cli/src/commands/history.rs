//! History command - flag watch events with unknown devices or users.

use std::path::PathBuf;

use colored::Colorize;
use reelclean::clean::history::{ALL_INCONSISTENCIES, INVALID_IDS, UNEXPECTED_DEVICES};
use reelclean::{HistoryFindings, MemoryStore, Severity, SqliteStore, TableStore};

use super::{build_pipeline, print_report, require_file};

pub fn run(
    file: PathBuf,
    users: PathBuf,
    database: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&file)?;
    require_file(&users)?;

    println!(
        "{} {}",
        "Checking watch history".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline = build_pipeline(config, output_dir)?;
    let mut store: Box<dyn TableStore> = match database {
        Some(path) => Box::new(SqliteStore::open(&path)?),
        None => Box::new(MemoryStore::new()),
    };

    let findings = pipeline.validate_history(&file, &users, store.as_mut())?;

    print_report(&findings.report, verbose);
    println!();

    ensure_checked(&findings)?;

    if findings.is_empty() {
        println!("{}", "No inconsistencies found - history looks clean!".green());
        return Ok(());
    }

    println!(
        "Found {} records with unexpected devices",
        findings.count(UNEXPECTED_DEVICES).to_string().yellow()
    );
    println!(
        "Found {} records with invalid user IDs",
        findings.count(INVALID_IDS).to_string().yellow()
    );
    println!(
        "Total of {} inconsistencies identified",
        findings.count(ALL_INCONSISTENCIES).to_string().red().bold()
    );
    Ok(())
}

/// Fail when the checks could not run (the history lacked a required column).
fn ensure_checked(findings: &HistoryFindings) -> Result<(), Box<dyn std::error::Error>> {
    if !findings.report.has_errors() {
        return Ok(());
    }
    let reasons: Vec<&str> = findings
        .report
        .with_severity(Severity::Error)
        .map(|o| o.description.as_str())
        .collect();
    println!("{}", "Watch history could not be checked".red().bold());
    Err(format!("watch history was not checked: {}", reasons.join("; ")).into())
}
