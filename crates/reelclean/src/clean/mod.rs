//! Cleaning rules, one module per dataset.

pub mod history;
pub mod interval;
pub mod ratings;
mod report;
pub mod subscriptions;
pub mod temporal;
pub mod users;

use std::cmp::Ordering;

pub use history::{HistoryFindings, HistoryRules, ReferentialValidator};
pub use interval::{merge_spans, Span};
pub use ratings::{RatingResolver, RatingRules, ResolutionMode};
pub use report::{CleaningOutcome, CleaningReport, RowAudit};
pub use subscriptions::{SubscriptionCleaner, SubscriptionSummary};
pub use users::{UserRules, UserSanitizer};

use crate::error::{CleanError, Result};
use crate::input::DataTable;
use crate::validation::{Evidence, Observation, ObservationType, Severity};

/// Column names that form the input contract.
pub mod columns {
    pub const USER_ID: &str = "user_id";
    pub const MOVIE_ID: &str = "movie_id";
    pub const RATING: &str = "rating";
    pub const TIMESTAMP: &str = "timestamp";
    pub const START_DATE: &str = "start_date";
    pub const END_DATE: &str = "end_date";
    pub const AMOUNT_PAID: &str = "amount_paid";
    pub const AGE: &str = "age";
    pub const EMAIL: &str = "email";
    pub const COUNTRY: &str = "country";
    pub const DEVICE: &str = "device";
}

/// Drop exact duplicate rows and record how many went.
pub(crate) fn remove_duplicates(table: &mut DataTable, report: &mut CleaningReport) {
    let total = table.row_count();
    let removed = table.drop_duplicate_rows();
    if removed > 0 {
        report.observe(
            Observation::new(
                ObservationType::DuplicateRow,
                Severity::Warning,
                "",
                format!("Removed {} duplicate rows", removed),
            )
            .with_evidence(Evidence::new().with_occurrences(removed, total))
            .with_rule("exact_duplicates"),
        );
    }
}

/// Fail the run when columns the rule set cannot do without are absent.
pub(crate) fn require_columns(
    table: &DataTable,
    report: &mut CleaningReport,
    required: &[&str],
) -> Result<()> {
    let missing = table.missing_columns(required);
    if missing.is_empty() {
        return Ok(());
    }
    report.observe(
        Observation::new(
            ObservationType::MissingColumn,
            Severity::Error,
            missing.join(", "),
            format!("Missing required columns {:?}", missing),
        )
        .with_evidence(Evidence::new().with_expected(required.to_vec()))
        .with_rule("required_columns"),
    );
    Err(CleanError::missing_columns(&report.dataset, &missing))
}

/// Record that an optional rule was skipped because its column is absent.
pub(crate) fn skip_rule(report: &mut CleaningReport, column: &str, rule: &str) {
    report.observe(
        Observation::new(
            ObservationType::MissingColumn,
            Severity::Warning,
            column,
            format!("No {} column found in the dataset; skipping {}", column, rule),
        )
        .with_rule(rule),
    );
}

/// Order identifier keys numerically when both are numbers, textually otherwise.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Render a computed number the way the input column spells numbers.
///
/// Integral columns get integers; float columns always carry a decimal point.
pub fn format_number(value: f64, integral: bool) -> String {
    if integral && value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let rounded = (value * 1e9).round() / 1e9;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// True if a numeric cell is written without a fractional part.
pub(crate) fn is_integral_text(value: &str) -> bool {
    !value.trim().contains(['.', 'e', 'E'])
}
