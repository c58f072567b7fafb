//! Cleaning reports: what each rule removed, rewrote or flagged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::input::{DataTable, SourceMetadata};
use crate::validation::{Observation, ObservationType, Severity};

/// Result of running a cleaning rule set over one table.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    /// The cleaned table.
    pub table: DataTable,
    /// What happened along the way.
    pub report: CleaningReport,
}

/// Summary of one cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Dataset name (users, ratings, subscriptions, watch_history).
    pub dataset: String,

    /// The file the run started from, when it came from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceMetadata>,

    /// Rows handed to the rules.
    pub rows_in: usize,

    /// Rows in the cleaned output.
    pub rows_out: usize,

    /// Inconsistencies detected, in detection order.
    pub observations: Vec<Observation>,

    /// Per-cell rewrites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audits: Vec<RowAudit>,

    /// Files written for this run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PathBuf>,
}

/// Audit information for a single rewritten cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowAudit {
    /// Row index (0-based) in the table the rule saw.
    pub row: usize,

    /// Column that was changed.
    pub column: String,

    /// Original value before the rewrite.
    pub original_value: String,

    /// New value after the rewrite.
    pub new_value: String,

    /// Reason for the change.
    pub reason: String,
}

impl CleaningReport {
    /// Start a report for `rows_in` incoming rows.
    pub fn new(dataset: impl Into<String>, rows_in: usize) -> Self {
        Self {
            dataset: dataset.into(),
            source: None,
            rows_in,
            rows_out: rows_in,
            observations: Vec::new(),
            audits: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Record an observation and log it at a level matching its severity.
    pub fn observe(&mut self, observation: Observation) {
        match observation.severity {
            Severity::Info => info!("[{}] {}", self.dataset, observation.description),
            Severity::Warning => warn!("[{}] {}", self.dataset, observation.description),
            Severity::Error => error!("[{}] {}", self.dataset, observation.description),
        }
        self.observations.push(observation);
    }

    /// Record a cell rewrite.
    pub fn audit(&mut self, audit: RowAudit) {
        self.audits.push(audit);
    }

    /// Close the report with the final row count.
    pub fn finish(&mut self, rows_out: usize) {
        self.rows_out = rows_out;
        info!(
            "[{}] Final dataset contains {} records ({} in)",
            self.dataset, rows_out, self.rows_in
        );
    }

    /// Rows dropped between input and output.
    pub fn rows_removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    /// Total occurrences across observations of one type.
    pub fn count(&self, observation_type: ObservationType) -> usize {
        self.observations
            .iter()
            .filter(|o| o.observation_type == observation_type)
            .map(|o| o.occurrences())
            .sum()
    }

    /// Observations at a given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(move |o| o.severity == severity)
    }

    /// Returns true if any rule could not run.
    pub fn has_errors(&self) -> bool {
        self.with_severity(Severity::Error).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Evidence;

    #[test]
    fn test_count_sums_occurrences_by_type() {
        let mut report = CleaningReport::new("ratings", 10);
        report.observe(
            Observation::new(ObservationType::OutOfRange, Severity::Warning, "rating", "2 out")
                .with_evidence(Evidence::new().with_occurrences(2, 10)),
        );
        report.observe(
            Observation::new(ObservationType::OutOfRange, Severity::Warning, "rating", "1 out")
                .with_evidence(Evidence::new().with_occurrences(1, 8)),
        );
        report.finish(7);

        assert_eq!(report.count(ObservationType::OutOfRange), 3);
        assert_eq!(report.count(ObservationType::DuplicateRow), 0);
        assert_eq!(report.rows_removed(), 3);
        assert!(!report.has_errors());
    }
}
