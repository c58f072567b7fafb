//! Subscription cleaning: date validation, amount checks and per-user
//! merging of overlapping subscription periods.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::Result;
use crate::input::DataTable;
use crate::validation::{Evidence, Observation, ObservationType, Severity};

use super::columns::{AMOUNT_PAID, END_DATE, START_DATE, USER_ID};
use super::interval::{merge_spans, Span};
use super::report::{CleaningOutcome, CleaningReport, RowAudit};
use super::temporal::{format_datetime, parse_datetime};
use super::{
    compare_keys, format_number, is_integral_text, remove_duplicates, require_columns, skip_rule,
};

/// Dataset name used in reports and logs.
pub const DATASET: &str = "subscriptions";

/// A row that survived validation, with its parsed fields.
struct Candidate {
    /// Index in the deduplicated table.
    index: usize,
    row: Vec<String>,
    user: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    amount: Option<f64>,
}

/// Cleans subscription tables and merges overlapping periods per user.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionCleaner;

impl SubscriptionCleaner {
    /// Create a new subscription cleaner.
    pub fn new() -> Self {
        Self
    }

    /// Run every subscription rule over `table`.
    ///
    /// Fails only when `user_id`, `start_date` or `end_date` is absent.
    pub fn clean(&self, mut table: DataTable) -> Result<CleaningOutcome> {
        let mut report = CleaningReport::new(DATASET, table.row_count());

        remove_duplicates(&mut table, &mut report);
        require_columns(&table, &mut report, &[USER_ID, START_DATE, END_DATE])?;

        let candidates = self.validate_rows(&table, &mut report);

        info!("[{}] Merging overlapping subscriptions by user...", DATASET);
        let merged = self.merge_by_user(&table, candidates, &mut report);
        let cleaned = table.with_rows(merged);

        if let Some(summary) = SubscriptionSummary::from_table(&cleaned) {
            info!(
                "[{}] Average subscription duration: {:.2} days",
                DATASET, summary.average_duration_days
            );
            if let Some(avg) = summary.average_amount {
                info!("[{}] Average amount paid: ${:.2}", DATASET, avg);
            }
        }

        report.finish(cleaned.row_count());
        Ok(CleaningOutcome {
            table: cleaned,
            report,
        })
    }

    /// Parse dates and amounts, dropping rows that fail.
    fn validate_rows(&self, table: &DataTable, report: &mut CleaningReport) -> Vec<Candidate> {
        // Columns were checked by the caller
        let user_col = table.column_index(USER_ID).unwrap_or_default();
        let start_col = table.column_index(START_DATE).unwrap_or_default();
        let end_col = table.column_index(END_DATE).unwrap_or_default();
        let amount_col = table.column_index(AMOUNT_PAID);
        let total = table.row_count();

        let mut no_user = Vec::new();
        let mut bad_dates = Vec::new();
        let mut inverted = Vec::new();
        let mut bad_amounts = Vec::new();
        let mut negative = Vec::new();
        let mut candidates = Vec::with_capacity(total);

        for (index, row) in table.rows.iter().enumerate() {
            if DataTable::is_null_value(&row[user_col]) {
                no_user.push(index);
                continue;
            }

            let (Some(start), Some(end)) =
                (parse_datetime(&row[start_col]), parse_datetime(&row[end_col]))
            else {
                bad_dates.push(index);
                continue;
            };

            if start > end {
                inverted.push(index);
                continue;
            }

            let amount = match amount_col {
                Some(col) => match row[col].trim().parse::<f64>() {
                    Ok(a) if a.is_nan() => {
                        bad_amounts.push(index);
                        continue;
                    }
                    Ok(a) if a < 0.0 => {
                        negative.push(index);
                        continue;
                    }
                    Ok(a) => Some(a),
                    Err(_) => {
                        bad_amounts.push(index);
                        continue;
                    }
                },
                None => None,
            };

            candidates.push(Candidate {
                index,
                row: row.clone(),
                user: DataTable::normalize_key(&row[user_col]),
                start,
                end,
                amount,
            });
        }

        if !no_user.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::UnparseableValue,
                    Severity::Warning,
                    USER_ID,
                    format!("Removed {} subscriptions without a user", no_user.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(no_user.len(), total)
                        .with_sample_rows(no_user),
                )
                .with_rule("user_id_missing"),
            );
        }

        if !bad_dates.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::UnparseableValue,
                    Severity::Warning,
                    format!("{}, {}", START_DATE, END_DATE),
                    format!("Removed {} rows with invalid dates", bad_dates.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(bad_dates.len(), total)
                        .with_sample_rows(bad_dates),
                )
                .with_rule("date_parsing"),
            );
        }

        if !inverted.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::InvertedInterval,
                    Severity::Warning,
                    format!("{}, {}", START_DATE, END_DATE),
                    format!(
                        "Removed {} subscriptions whose start date is after the end date",
                        inverted.len()
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(inverted.len(), total)
                        .with_sample_rows(inverted),
                )
                .with_rule("date_order"),
            );
        }

        if amount_col.is_none() {
            skip_rule(report, AMOUNT_PAID, "amount checks (merging dates only)");
        }

        if !bad_amounts.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::UnparseableValue,
                    Severity::Warning,
                    AMOUNT_PAID,
                    format!("Removed {} subscriptions with unreadable amounts", bad_amounts.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(bad_amounts.len(), total)
                        .with_sample_rows(bad_amounts),
                )
                .with_rule("amount_parsing"),
            );
        }

        if !negative.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::OutOfRange,
                    Severity::Warning,
                    AMOUNT_PAID,
                    format!("Removed {} subscriptions with negative amounts", negative.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(negative.len(), total)
                        .with_sample_rows(negative)
                        .with_expected(json!({ "min": 0.0 })),
                )
                .with_rule("non_negative_amount"),
            );
        }

        candidates
    }

    /// Partition candidates by user, merge each user's spans, and
    /// materialize the merged rows in ascending user order.
    fn merge_by_user(
        &self,
        table: &DataTable,
        candidates: Vec<Candidate>,
        report: &mut CleaningReport,
    ) -> Vec<Vec<String>> {
        let end_col = table.column_index(END_DATE).unwrap_or_default();
        let amount_col = table.column_index(AMOUNT_PAID);
        let integral = amount_col
            .map(|col| candidates.iter().all(|c| is_integral_text(&c.row[col])))
            .unwrap_or(true);

        let mut groups: IndexMap<&str, Vec<Span<NaiveDateTime>>> = IndexMap::new();
        for (slot, candidate) in candidates.iter().enumerate() {
            groups
                .entry(candidate.user.as_str())
                .or_default()
                .push(Span::new(candidate.start, candidate.end, candidate.amount, slot));
        }
        groups.sort_by(|a, _, b, _| compare_keys(a, b));

        let input_count = candidates.len();
        let mut rows = Vec::with_capacity(input_count);
        let mut merged_rows = Vec::new();

        for (user, spans) in groups {
            let merged = merge_spans(spans);
            debug!("[{}] user {}: {} merged periods", DATASET, user, merged.len());

            for span in merged {
                let seed = &candidates[span.row];
                let mut row = seed.row.clone();

                if span.sources > 1 {
                    merged_rows.push(seed.index);

                    if span.end != seed.end {
                        let new_end = format_datetime(span.end);
                        report.audit(RowAudit {
                            row: seed.index,
                            column: END_DATE.to_string(),
                            original_value: row[end_col].clone(),
                            new_value: new_end.clone(),
                            reason: format!(
                                "Extended to cover {} overlapping periods",
                                span.sources
                            ),
                        });
                        row[end_col] = new_end;
                    }

                    if let (Some(col), Some(total)) = (amount_col, span.amount) {
                        let new_amount = format_number(total, integral);
                        report.audit(RowAudit {
                            row: seed.index,
                            column: AMOUNT_PAID.to_string(),
                            original_value: row[col].clone(),
                            new_value: new_amount.clone(),
                            reason: format!("Summed {} overlapping payments", span.sources),
                        });
                        row[col] = new_amount;
                    }
                }

                rows.push(row);
            }
        }

        let folded = input_count - rows.len();
        if folded > 0 {
            report.observe(
                Observation::new(
                    ObservationType::Merged,
                    Severity::Info,
                    format!("{}, {}", START_DATE, END_DATE),
                    format!(
                        "Merged {} overlapping subscription records into {} periods",
                        folded + merged_rows.len(),
                        merged_rows.len()
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(folded, input_count)
                        .with_sample_rows(merged_rows),
                )
                .with_rule("interval_merge"),
            );
        }

        rows
    }
}

/// Descriptive figures for a cleaned subscription table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    /// Number of subscription periods.
    pub periods: usize,
    /// Mean of `end_date - start_date` in whole days.
    pub average_duration_days: f64,
    /// Mean amount paid, when the column exists.
    pub average_amount: Option<f64>,
}

impl SubscriptionSummary {
    /// Compute the summary; `None` if no row has parseable dates.
    pub fn from_table(table: &DataTable) -> Option<Self> {
        let start_col = table.column_index(START_DATE)?;
        let end_col = table.column_index(END_DATE)?;

        let durations: Vec<i64> = table
            .rows
            .iter()
            .filter_map(|row| {
                let start = parse_datetime(&row[start_col])?;
                let end = parse_datetime(&row[end_col])?;
                Some((end - start).num_days())
            })
            .collect();

        if durations.is_empty() {
            return None;
        }

        let average_amount = table.column_index(AMOUNT_PAID).and_then(|col| {
            let amounts: Vec<f64> = table
                .column_values(col)
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect();
            (!amounts.is_empty()).then(|| amounts.iter().sum::<f64>() / amounts.len() as f64)
        });

        Some(Self {
            periods: durations.len(),
            average_duration_days: durations.iter().sum::<i64>() as f64 / durations.len() as f64,
            average_amount,
        })
    }
}
