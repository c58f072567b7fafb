//! Referential checks for watch-history events: known devices and known users.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::input::DataTable;
use crate::validation::{Evidence, Observation, ObservationType, Severity};

use super::columns::{DEVICE, USER_ID};
use super::report::CleaningReport;
use super::{remove_duplicates, require_columns};

/// Dataset name used in reports and logs.
pub const DATASET: &str = "watch_history";

/// Output table names, also used as file stems.
pub const UNEXPECTED_DEVICES: &str = "unexpected_devices";
pub const INVALID_IDS: &str = "invalid_ids";
pub const ALL_INCONSISTENCIES: &str = "all_inconsistencies";

/// Configuration for the watch-history checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRules {
    /// Device names considered valid.
    pub devices: Vec<String>,
    /// Label written into missing device cells before comparison.
    pub unknown_device: String,
}

impl Default for HistoryRules {
    fn default() -> Self {
        Self {
            devices: ["Smartphone", "Laptop", "Tablet", "Smart TV", "Desktop"]
                .into_iter()
                .map(String::from)
                .collect(),
            unknown_device: "Unknown".to_string(),
        }
    }
}

/// Anomaly tables produced by the referential checks.
#[derive(Debug, Clone)]
pub struct HistoryFindings {
    /// Rows whose device is not on the allow-list.
    pub unexpected_devices: Option<DataTable>,
    /// Rows whose user is not in the known-user set.
    pub invalid_ids: Option<DataTable>,
    /// Deduplicated union of the two.
    pub all_inconsistencies: Option<DataTable>,
    /// Observations for the run.
    pub report: CleaningReport,
}

impl HistoryFindings {
    fn empty(report: CleaningReport) -> Self {
        Self {
            unexpected_devices: None,
            invalid_ids: None,
            all_inconsistencies: None,
            report,
        }
    }

    /// True when no anomaly table was produced.
    pub fn is_empty(&self) -> bool {
        self.all_inconsistencies.is_none()
    }

    /// The non-empty anomaly tables with their names, in output order.
    pub fn tables(&self) -> impl Iterator<Item = (&'static str, &DataTable)> {
        [
            (UNEXPECTED_DEVICES, self.unexpected_devices.as_ref()),
            (INVALID_IDS, self.invalid_ids.as_ref()),
            (ALL_INCONSISTENCIES, self.all_inconsistencies.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, table)| table.map(|t| (name, t)))
    }

    /// Row count of a named table (0 if it was not produced).
    pub fn count(&self, name: &str) -> usize {
        self.tables()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| t.row_count())
            .unwrap_or(0)
    }
}

/// Cross-checks watch-history rows against known users and devices.
#[derive(Debug, Clone, Default)]
pub struct ReferentialValidator {
    rules: HistoryRules,
}

impl ReferentialValidator {
    /// Create a validator with the default device allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom rules.
    pub fn with_rules(rules: HistoryRules) -> Self {
        Self { rules }
    }

    /// Run both checks.
    ///
    /// A history table lacking `user_id` or `device` yields no tables and
    /// an error-level observation in the report.
    pub fn validate(
        &self,
        mut history: DataTable,
        known_users: &HashSet<String>,
    ) -> HistoryFindings {
        let mut report = CleaningReport::new(DATASET, history.row_count());
        info!(
            "[{}] Checking {} records against {} known users",
            DATASET,
            history.row_count(),
            known_users.len()
        );

        if require_columns(&history, &mut report, &[USER_ID, DEVICE]).is_err() {
            report.finish(0);
            return HistoryFindings::empty(report);
        }

        let user_col = history.column_index(USER_ID).unwrap_or_default();
        let device_col = history.column_index(DEVICE).unwrap_or_default();
        let total = history.row_count();

        let mut filled = 0;
        for row in &mut history.rows {
            if DataTable::is_null_value(&row[device_col]) {
                row[device_col] = self.rules.unknown_device.clone();
                filled += 1;
            }
        }
        if filled > 0 {
            report.observe(
                Observation::new(
                    ObservationType::Imputed,
                    Severity::Info,
                    DEVICE,
                    format!(
                        "Labelled {} missing devices as '{}'",
                        filled, self.rules.unknown_device
                    ),
                )
                .with_evidence(Evidence::new().with_occurrences(filled, total))
                .with_rule("device_fill"),
            );
        }

        // Rows that differed only in how the device was missing are duplicates now
        remove_duplicates(&mut history, &mut report);
        let total = history.row_count();

        let device_rows: Vec<usize> = (0..total)
            .filter(|&idx| {
                let device = &history.rows[idx][device_col];
                !self.rules.devices.iter().any(|d| d == device)
            })
            .collect();

        let id_rows: Vec<usize> = (0..total)
            .filter(|&idx| {
                !known_users.contains(&DataTable::normalize_key(&history.rows[idx][user_col]))
            })
            .collect();

        let unexpected_devices = (!device_rows.is_empty()).then(|| {
            report.observe(
                Observation::new(
                    ObservationType::NotAllowed,
                    Severity::Warning,
                    DEVICE,
                    format!("Found {} records with unexpected devices", device_rows.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(device_rows.len(), total)
                        .with_sample_rows(device_rows.iter().copied())
                        .with_expected(self.rules.devices.clone()),
                )
                .with_rule("device_allow_list"),
            );
            select(&history, &device_rows)
        });

        let invalid_ids = (!id_rows.is_empty()).then(|| {
            report.observe(
                Observation::new(
                    ObservationType::UnknownReference,
                    Severity::Warning,
                    USER_ID,
                    format!("Found {} records with invalid user IDs", id_rows.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(id_rows.len(), total)
                        .with_sample_rows(id_rows.iter().copied()),
                )
                .with_rule("known_users"),
            );
            select(&history, &id_rows)
        });

        let all_inconsistencies = if unexpected_devices.is_some() || invalid_ids.is_some() {
            let rows: Vec<Vec<String>> = unexpected_devices
                .iter()
                .chain(invalid_ids.iter())
                .flat_map(|t| t.rows.iter().cloned())
                .collect();
            let mut union = history.with_rows(rows);
            union.drop_duplicate_rows();
            info!(
                "[{}] Total of {} inconsistencies identified",
                DATASET,
                union.row_count()
            );
            Some(union)
        } else {
            None
        };

        report.finish(all_inconsistencies.as_ref().map_or(0, |t| t.row_count()));

        HistoryFindings {
            unexpected_devices,
            invalid_ids,
            all_inconsistencies,
            report,
        }
    }
}

/// Copy the given rows into a new table with the same headers.
fn select(table: &DataTable, indices: &[usize]) -> DataTable {
    table.with_rows(indices.iter().map(|&i| table.rows[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            b',',
        )
    }

    fn users(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_finds_devices_and_ids() {
        let history = make_table(
            &["user_id", "movie_id", "device"],
            &[
                &["1", "10", "Laptop"],
                &["2", "11", "Toaster"],
                &["9", "12", "Tablet"],
                &["9", "13", "Fridge"],
                &["1", "14", ""],
            ],
        );

        let findings = ReferentialValidator::new().validate(history, &users(&["1", "2"]));

        assert_eq!(findings.count(UNEXPECTED_DEVICES), 3);
        assert_eq!(findings.count(INVALID_IDS), 2);
        // Row ["9","13","Fridge"] appears in both sets but once in the union
        assert_eq!(findings.count(ALL_INCONSISTENCIES), 4);

        let devices = findings.unexpected_devices.as_ref().unwrap();
        assert_eq!(devices.rows[2], vec!["1", "14", "Unknown"]);
    }

    #[test]
    fn test_clean_history_has_no_tables() {
        let history = make_table(&["user_id", "device"], &[&["1", "Laptop"], &["2", "Smart TV"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["1", "2"]));

        assert!(findings.is_empty());
        assert_eq!(findings.tables().count(), 0);
        assert!(!findings.report.has_errors());
    }

    #[test]
    fn test_only_id_problems() {
        let history = make_table(&["user_id", "device"], &[&["3", "Laptop"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["1"]));

        let names: Vec<&str> = findings.tables().map(|(n, _)| n).collect();
        assert_eq!(names, vec![INVALID_IDS, ALL_INCONSISTENCIES]);
    }

    #[test]
    fn test_missing_device_column_aborts() {
        let history = make_table(&["user_id", "movie_id"], &[&["1", "10"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["1"]));

        assert!(findings.is_empty());
        assert!(findings.report.has_errors());
    }

    #[test]
    fn test_numeric_ids_compare_by_value() {
        let history = make_table(&["user_id", "device"], &[&["7.0", "Laptop"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["7"]));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_duplicate_events_are_reported_once() {
        let history = make_table(
            &["user_id", "device"],
            &[&["5", "Toaster"], &["5", "Toaster"]],
        );
        let findings = ReferentialValidator::new().validate(history, &users(&["1"]));

        assert_eq!(findings.count(UNEXPECTED_DEVICES), 1);
        assert_eq!(findings.count(INVALID_IDS), 1);
        assert_eq!(findings.count(ALL_INCONSISTENCIES), 1);
        assert_eq!(findings.report.count(ObservationType::DuplicateRow), 1);
    }

    #[test]
    fn test_missing_devices_collapse_after_fill() {
        let history = make_table(&["user_id", "device"], &[&["1", ""], &["1", "NA"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["1"]));

        assert_eq!(findings.count(UNEXPECTED_DEVICES), 1);
        assert_eq!(findings.unexpected_devices.as_ref().unwrap().rows[0], vec!["1", "Unknown"]);
    }

    #[test]
    fn test_device_names_match_exactly() {
        let history = make_table(&["user_id", "device"], &[&["1", "Laptop "], &["1", "laptop"]]);
        let findings = ReferentialValidator::new().validate(history, &users(&["1"]));

        assert_eq!(findings.count(UNEXPECTED_DEVICES), 2);
    }
}
