//! User profile sanitizers: age bounds with median backfill, email format,
//! and country allow-list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::input::DataTable;
use crate::validation::{Evidence, Observation, ObservationType, Severity};

use super::columns::{AGE, COUNTRY, EMAIL};
use super::report::{CleaningOutcome, CleaningReport, RowAudit};
use super::{format_number, remove_duplicates, skip_rule};

/// Dataset name used in reports and logs.
pub const DATASET: &str = "users";

/// Syntactic email check: ASCII word characters, dots and hyphens around an
/// `@`, and a dotted suffix. Deliberately far from RFC 5322.
pub const DEFAULT_EMAIL_PATTERN: &str = r"^[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+\.[A-Za-z0-9_]+$";

/// Address written into empty email cells.
pub const DEFAULT_PLACEHOLDER_EMAIL: &str = "unknown@example.com";

static DEFAULT_EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_EMAIL_PATTERN).unwrap());

/// Configuration for the user sanitizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRules {
    /// Lowest valid age (inclusive).
    pub min_age: f64,
    /// Highest valid age (inclusive).
    pub max_age: f64,
    /// Regex an email must match to be kept.
    pub email_pattern: String,
    /// Replacement for empty email cells.
    pub placeholder_email: String,
    /// Countries a user may belong to.
    pub countries: Vec<String>,
}

impl Default for UserRules {
    fn default() -> Self {
        Self {
            min_age: 0.0,
            max_age: 120.0,
            email_pattern: DEFAULT_EMAIL_PATTERN.to_string(),
            placeholder_email: DEFAULT_PLACEHOLDER_EMAIL.to_string(),
            countries: ["USA", "India", "Canada", "UK", "Australia"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Applies the column-scoped user rules in one pass over a table.
#[derive(Debug, Clone)]
pub struct UserSanitizer {
    rules: UserRules,
    email: Regex,
}

impl UserSanitizer {
    /// Create a sanitizer with the default rules.
    pub fn new() -> Self {
        Self {
            rules: UserRules::default(),
            email: DEFAULT_EMAIL_REGEX.clone(),
        }
    }

    /// Create a sanitizer with custom rules, compiling the email pattern.
    pub fn with_rules(rules: UserRules) -> Result<Self> {
        let email = if rules.email_pattern == DEFAULT_EMAIL_PATTERN {
            DEFAULT_EMAIL_REGEX.clone()
        } else {
            Regex::new(&rules.email_pattern)?
        };
        Ok(Self { rules, email })
    }

    /// The active rules.
    pub fn rules(&self) -> &UserRules {
        &self.rules
    }

    /// Run every user rule. Absent columns skip their rule with a warning.
    pub fn sanitize(&self, mut table: DataTable) -> CleaningOutcome {
        let mut report = CleaningReport::new(DATASET, table.row_count());

        remove_duplicates(&mut table, &mut report);

        match table.column_index(AGE) {
            Some(col) => self.clean_ages(&mut table, col, &mut report),
            None => skip_rule(&mut report, AGE, "age cleaning"),
        }

        match table.column_index(EMAIL) {
            Some(col) => self.clean_emails(&mut table, col, &mut report),
            None => skip_rule(&mut report, EMAIL, "email validation"),
        }

        match table.column_index(COUNTRY) {
            Some(col) => self.filter_countries(&mut table, col, &mut report),
            None => skip_rule(&mut report, COUNTRY, "country filtering"),
        }

        report.finish(table.row_count());
        CleaningOutcome { table, report }
    }

    /// Null out-of-range ages, then backfill every null with the median of
    /// the ages that remain.
    fn clean_ages(&self, table: &mut DataTable, col: usize, report: &mut CleaningReport) {
        let total = table.row_count();
        let mut valid = Vec::with_capacity(total);
        let mut out_of_range = Vec::new();
        let mut to_fill = Vec::new();

        for (idx, value) in table.column_values(col).enumerate() {
            if DataTable::is_null_value(value) {
                to_fill.push(idx);
                continue;
            }
            match value.trim().parse::<f64>() {
                Ok(age) if age >= self.rules.min_age && age <= self.rules.max_age => {
                    valid.push(age)
                }
                _ => {
                    out_of_range.push(idx);
                    to_fill.push(idx);
                }
            }
        }

        if !out_of_range.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::OutOfRange,
                    Severity::Warning,
                    AGE,
                    format!(
                        "{} ages outside [{}, {}] or unreadable",
                        out_of_range.len(),
                        self.rules.min_age,
                        self.rules.max_age
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(out_of_range.len(), total)
                        .with_sample_rows(out_of_range)
                        .with_expected(json!({
                            "min": self.rules.min_age,
                            "max": self.rules.max_age
                        })),
                )
                .with_rule("age_range"),
            );
        }

        if to_fill.is_empty() {
            return;
        }

        let Some(median) = median(&mut valid) else {
            // Nothing to fill from; invalid ages become empty
            for &idx in &to_fill {
                table.set(idx, col, String::new());
            }
            report.observe(
                Observation::new(
                    ObservationType::Imputed,
                    Severity::Warning,
                    AGE,
                    format!("No valid ages to compute a median; {} ages left empty", to_fill.len()),
                )
                .with_evidence(Evidence::new().with_occurrences(to_fill.len(), total))
                .with_rule("age_median_fill"),
            );
            return;
        };

        let fill = format_number(median, true);
        for &idx in &to_fill {
            let original = table.get(idx, col).unwrap_or_default().to_string();
            report.audit(RowAudit {
                row: idx,
                column: AGE.to_string(),
                original_value: original,
                new_value: fill.clone(),
                reason: "Missing or out-of-range age replaced by median".to_string(),
            });
            table.set(idx, col, fill.clone());
        }

        report.observe(
            Observation::new(
                ObservationType::Imputed,
                Severity::Info,
                AGE,
                format!(
                    "Cleaned age column and filled {} values with median: {}",
                    to_fill.len(),
                    fill
                ),
            )
            .with_evidence(
                Evidence::new()
                    .with_value(median)
                    .with_occurrences(to_fill.len(), total)
                    .with_sample_rows(to_fill),
            )
            .with_rule("age_median_fill"),
        );
    }

    /// Replace empty emails with the placeholder, then drop rows whose email
    /// fails the pattern.
    fn clean_emails(&self, table: &mut DataTable, col: usize, report: &mut CleaningReport) {
        let total = table.row_count();

        let empty: Vec<usize> = table
            .column_values(col)
            .enumerate()
            .filter(|(_, v)| v.is_empty())
            .map(|(idx, _)| idx)
            .collect();

        for &idx in &empty {
            report.audit(RowAudit {
                row: idx,
                column: EMAIL.to_string(),
                original_value: String::new(),
                new_value: self.rules.placeholder_email.clone(),
                reason: "Empty email replaced by placeholder".to_string(),
            });
            table.set(idx, col, self.rules.placeholder_email.clone());
        }

        if !empty.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::Imputed,
                    Severity::Info,
                    EMAIL,
                    format!(
                        "Replaced {} empty emails with {}",
                        empty.len(),
                        self.rules.placeholder_email
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(empty.len(), total)
                        .with_sample_rows(empty),
                )
                .with_rule("email_placeholder"),
            );
        }

        let mut examples = Vec::new();
        let removed = table.retain_rows(|_, row| {
            let ok = self.email.is_match(&row[col]);
            if !ok && examples.len() < 3 {
                examples.push(row[col].clone());
            }
            ok
        });

        info!(
            "[{}] Valid emails: {} out of {}",
            DATASET,
            table.row_count(),
            total
        );

        if !removed.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::PatternViolation,
                    Severity::Warning,
                    EMAIL,
                    format!("Removed {} rows with malformed email addresses", removed.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_value(examples)
                        .with_pattern(self.email.as_str())
                        .with_occurrences(removed.len(), total)
                        .with_sample_rows(removed),
                )
                .with_rule("email_format"),
            );
        }
    }

    /// Keep only rows whose country is on the allow-list.
    fn filter_countries(&self, table: &mut DataTable, col: usize, report: &mut CleaningReport) {
        let total = table.row_count();
        let mut examples: Vec<String> = Vec::new();

        let removed = table.retain_rows(|_, row| {
            let country = row[col].as_str();
            let ok = self.rules.countries.iter().any(|c| c == country);
            if !ok && examples.len() < 3 && !examples.iter().any(|e| e == country) {
                examples.push(country.to_string());
            }
            ok
        });

        info!(
            "[{}] Valid countries: {} out of {}",
            DATASET,
            table.row_count(),
            total
        );

        if !removed.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::NotAllowed,
                    Severity::Warning,
                    COUNTRY,
                    format!("Removed {} rows with a country outside the allow-list", removed.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_value(examples)
                        .with_occurrences(removed.len(), total)
                        .with_sample_rows(removed)
                        .with_expected(self.rules.countries.clone()),
                )
                .with_rule("country_allow_list"),
            );
        }
    }
}

impl Default for UserSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of the values, sorting them in place.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
