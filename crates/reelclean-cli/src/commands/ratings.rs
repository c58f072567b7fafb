//! Ratings command - range and reference checks, then one rating per pair.

use std::path::PathBuf;

use colored::Colorize;
use reelclean::ObservationType;

use super::{build_pipeline, print_report, require_file};

pub fn run(
    file: PathBuf,
    users: Option<PathBuf>,
    movies: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    require_file(&file)?;
    for reference in users.iter().chain(movies.iter()) {
        require_file(reference)?;
    }

    println!(
        "{} {}",
        "Cleaning ratings".cyan().bold(),
        file.display().to_string().white()
    );

    let pipeline = build_pipeline(config, output_dir)?;
    let report = pipeline.clean_ratings(&file, users.as_deref(), movies.as_deref())?;

    print_report(&report, verbose);

    let resolved = report.count(ObservationType::ConflictResolved);
    if resolved > 0 {
        println!(
            "Resolved {} conflicting ratings",
            resolved.to_string().white().bold()
        );
    }
    Ok(())
}
