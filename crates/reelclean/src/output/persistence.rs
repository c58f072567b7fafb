//! Save/load cleaning reports as JSON.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::clean::CleaningReport;
use crate::error::{CleanError, Result};

impl CleaningReport {
    /// Save the report as pretty-printed JSON.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use reelclean::CleaningReport;
    /// # fn example(report: &CleaningReport) -> reelclean::Result<()> {
    /// report.save("out/ratings_report.json")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| CleanError::io(parent, e))?;
            }
        }

        let file = File::create(path).map_err(|e| CleanError::io(path, e))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;

        Ok(())
    }

    /// Load a report previously written by [`CleaningReport::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CleanError::io(path, e))?;
        let report = serde_json::from_reader(BufReader::new(file))?;
        Ok(report)
    }

    /// Conventional report path for this dataset inside `dir`.
    pub fn default_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(format!("{}_report.json", self.dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Evidence, Observation, ObservationType, Severity};
    use tempfile::TempDir;

    #[test]
    fn test_save_load_report() {
        let dir = TempDir::new().unwrap();
        let mut report = CleaningReport::new("users", 4);
        report.observe(
            Observation::new(
                ObservationType::OutOfRange,
                Severity::Warning,
                "age",
                "2 ages out of range",
            )
            .with_evidence(Evidence::new().with_occurrences(2, 4)),
        );
        report.finish(4);

        let path = report.default_path(dir.path());
        assert!(path.ends_with("users_report.json"));
        report.save(&path).unwrap();

        let loaded = CleaningReport::load(&path).unwrap();
        assert_eq!(loaded.dataset, "users");
        assert_eq!(loaded.observations.len(), 1);
        assert_eq!(loaded.count(ObservationType::OutOfRange), 2);
    }

    #[test]
    fn test_load_missing_report() {
        let err = CleaningReport::load("/nonexistent/report.json").unwrap_err();
        assert!(err.is_not_found());
    }
}
