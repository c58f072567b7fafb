//! Users command - sanitize ages, emails and countries.

use std::path::PathBuf;

use colored::Colorize;

use super::{build_pipeline, print_report, require_file};

pub fn run(
    file: PathBuf,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&file)?;

    println!(
        "{} {}",
        "Cleaning users".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline = build_pipeline(config, output_dir)?;
    let report = pipeline.clean_users(&file)?;

    print_report(&report, verbose);
    Ok(())
}
