//! Subscriptions command - validate periods and merge overlaps per user.

use std::path::PathBuf;

use colored::Colorize;
use reelclean::ObservationType;

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
        "Cleaning subscriptions".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline = build_pipeline(config, output_dir)?;
    let report = pipeline.clean_subscriptions(&file)?;

    print_report(&report, verbose);

    let merged = report.count(ObservationType::Merged);
    if merged > 0 {
        println!(
            "Merged {} overlapping subscription records",
            merged.to_string().white().bold()
        );
    }
    Ok(())
}
