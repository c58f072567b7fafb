//! CLI command implementations.

pub mod history;
pub mod ratings;
pub mod subscriptions;
pub mod users;

use std::path::{Path, PathBuf};

use colored::Colorize;
use reelclean::{CleaningReport, Pipeline, PipelineConfig, Severity};
use tracing::debug;

/// Build a pipeline from an optional config file, with the output
/// directory flag taking precedence.
pub fn build_pipeline(
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => {
            debug!("Using configuration {}", path.display());
            PipelineConfig::load(&path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }
    debug!("Writing outputs to {}", config.output_dir.display());
    Ok(Pipeline::with_config(config)?)
}

/// Fail early with a readable message when an input is absent.
pub fn require_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    Ok(())
}

/// Print the human summary shared by every command.
pub fn print_report(report: &CleaningReport, verbose: bool) {
    let errors = report.with_severity(Severity::Error).count();
    let warnings = report.with_severity(Severity::Warning).count();
    let info = report.with_severity(Severity::Info).count();

    println!(
        "Rows: {} in, {} out ({} removed)",
        report.rows_in.to_string().white().bold(),
        report.rows_out.to_string().white().bold(),
        report.rows_removed().to_string().red()
    );
    println!(
        "Found {} observations ({} errors, {} warnings, {} info)",
        report.observations.len().to_string().white().bold(),
        errors.to_string().red(),
        warnings.to_string().yellow(),
        info.to_string().blue()
    );

    if verbose && !report.observations.is_empty() {
        println!();
        println!("{}", "Observations:".yellow().bold());
        for obs in &report.observations {
            let tag = match obs.severity {
                Severity::Error => "error".red(),
                Severity::Warning => "warn ".yellow(),
                Severity::Info => "info ".blue(),
            };
            println!("  {} {:18} {}", tag, obs.observation_type.label(), obs.description);
        }
    }

    if !report.outputs.is_empty() {
        println!();
        for path in &report.outputs {
            println!(
                "{} {}",
                "Saved to".green().bold(),
                path.display().to_string().white()
            );
        }
    }
}
