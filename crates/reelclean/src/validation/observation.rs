//! Observation types for detected inconsistencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of inconsistency detected by a cleaning rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// Rows repeating an earlier row across every column.
    DuplicateRow,
    /// A column a rule depends on is absent.
    MissingColumn,
    /// Date or timestamp that could not be parsed.
    UnparseableValue,
    /// Numeric value outside its valid range.
    OutOfRange,
    /// Subscription whose start date falls after its end date.
    InvertedInterval,
    /// Value that doesn't match its expected pattern (email).
    PatternViolation,
    /// Value outside a closed allow-list (country, device).
    NotAllowed,
    /// Identifier that doesn't exist in the reference set.
    UnknownReference,
    /// Missing or invalid value replaced by a computed fill value.
    Imputed,
    /// Overlapping records collapsed into one.
    Merged,
    /// Competing records for the same key resolved to one.
    ConflictResolved,
}

impl ObservationType {
    /// Get a human-readable label for the observation type.
    pub fn label(&self) -> &'static str {
        match self {
            ObservationType::DuplicateRow => "Duplicate Row",
            ObservationType::MissingColumn => "Missing Column",
            ObservationType::UnparseableValue => "Unparseable Value",
            ObservationType::OutOfRange => "Out of Range",
            ObservationType::InvertedInterval => "Inverted Interval",
            ObservationType::PatternViolation => "Pattern Violation",
            ObservationType::NotAllowed => "Not Allowed",
            ObservationType::UnknownReference => "Unknown Reference",
            ObservationType::Imputed => "Imputed",
            ObservationType::Merged => "Merged",
            ObservationType::ConflictResolved => "Conflict Resolved",
        }
    }
}

/// Severity level of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected normalization, no data lost.
    Info,
    /// Rows were excluded or a rule was skipped.
    Warning,
    /// The dataset violates its contract and a rule could not run.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// Evidence supporting an observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// The problematic value(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Pattern checked against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Number of affected rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<usize>,
    /// Percentage of affected rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Sample row indices (0-based, relative to the table the rule saw).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sample_rows: Vec<usize>,
    /// Expected value, range or set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl Evidence {
    /// Create empty evidence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set occurrences and the percentage they make of `total`.
    pub fn with_occurrences(mut self, count: usize, total: usize) -> Self {
        self.occurrences = Some(count);
        if total > 0 {
            self.percentage = Some((count as f64 / total as f64) * 100.0);
        }
        self
    }

    /// Set sample rows, keeping at most five.
    pub fn with_sample_rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.sample_rows = rows.into_iter().take(5).collect();
        self
    }

    /// Set expected value.
    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

/// An observation about an inconsistency found while cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Unique identifier for this observation.
    pub id: String,
    /// Type of issue.
    #[serde(rename = "type")]
    pub observation_type: ObservationType,
    /// Severity level.
    pub severity: Severity,
    /// Affected column name (empty for whole-row issues).
    pub column: String,
    /// Human-readable description.
    pub description: String,
    /// Supporting evidence.
    pub evidence: Evidence,
    /// When detected.
    pub detected_at: DateTime<Utc>,
    /// Rule that detected this issue.
    pub rule: String,
}

impl Observation {
    /// Create a new observation.
    pub fn new(
        observation_type: ObservationType,
        severity: Severity,
        column: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_observation_id(),
            observation_type,
            severity,
            column: column.into(),
            description: description.into(),
            evidence: Evidence::new(),
            detected_at: Utc::now(),
            rule: String::new(),
        }
    }

    /// Set the evidence.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    /// Set the rule name.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    /// Number of rows the observation covers (0 when not counted).
    pub fn occurrences(&self) -> usize {
        self.evidence.occurrences.unwrap_or(0)
    }
}

/// Generate a unique observation ID.
fn generate_observation_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("obs_{:03}", COUNTER.fetch_add(1, Ordering::SeqCst))
}
