//! Rating cleaning and conflict resolution for repeated (user, movie) pairs.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::input::DataTable;
use crate::validation::{Evidence, Observation, ObservationType, Severity};

use super::columns::{MOVIE_ID, RATING, TIMESTAMP, USER_ID};
use super::report::{CleaningOutcome, CleaningReport, RowAudit};
use super::temporal::parse_timestamp;
use super::{format_number, remove_duplicates, require_columns};

/// Dataset name used in reports and logs.
pub const DATASET: &str = "ratings";

/// Thresholds for the rating rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingRules {
    /// Lowest valid rating (inclusive).
    pub min_rating: f64,
    /// Highest valid rating (inclusive).
    pub max_rating: f64,
}

impl Default for RatingRules {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

/// How competing ratings for one (user, movie) pair are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Keep the most recent submission.
    Latest,
    /// Replace the group with its mean rating.
    Average,
}

impl ResolutionMode {
    /// Pick the mode from the table's shape: timestamps mean recency wins.
    pub fn detect(table: &DataTable) -> Self {
        if table.has_column(TIMESTAMP) {
            ResolutionMode::Latest
        } else {
            ResolutionMode::Average
        }
    }
}

/// A rating row that passed the range and reference filters.
struct Submission {
    /// Index in the deduplicated table.
    index: usize,
    key: (String, String),
    rating: f64,
}

/// Cleans rating tables down to one rating per (user, movie) pair.
#[derive(Debug, Clone, Default)]
pub struct RatingResolver {
    rules: RatingRules,
}

impl RatingResolver {
    /// Create a resolver with the default [0, 5] range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with custom thresholds.
    pub fn with_rules(rules: RatingRules) -> Self {
        Self { rules }
    }

    /// Run the rating rules.
    ///
    /// `known_users` and `known_movies` are optional allow-lists of
    /// normalized keys (see [`DataTable::key_set`]). Range and reference
    /// filters always run before conflict resolution.
    pub fn resolve(
        &self,
        mut table: DataTable,
        known_users: Option<&HashSet<String>>,
        known_movies: Option<&HashSet<String>>,
    ) -> Result<CleaningOutcome> {
        let mut report = CleaningReport::new(DATASET, table.row_count());

        remove_duplicates(&mut table, &mut report);
        require_columns(&table, &mut report, &[USER_ID, MOVIE_ID, RATING])?;

        let submissions = self.in_range(&table, &mut report);
        let submissions =
            filter_references(submissions, USER_ID, 0, known_users, &table, &mut report);
        let submissions =
            filter_references(submissions, MOVIE_ID, 1, known_movies, &table, &mut report);

        if known_users.is_none() && known_movies.is_none() {
            info!("[{}] No user or movie allow-list supplied; skipping reference checks", DATASET);
        }

        let mode = ResolutionMode::detect(&table);
        let rows = match mode {
            ResolutionMode::Latest => self.keep_latest(&table, submissions, &mut report),
            ResolutionMode::Average => self.average(&table, submissions, &mut report),
        };

        let cleaned = table.with_rows(rows);
        report.finish(cleaned.row_count());
        Ok(CleaningOutcome {
            table: cleaned,
            report,
        })
    }

    /// Drop ratings that are unparseable or outside the configured range.
    fn in_range(&self, table: &DataTable, report: &mut CleaningReport) -> Vec<Submission> {
        let user_col = table.column_index(USER_ID).unwrap_or_default();
        let movie_col = table.column_index(MOVIE_ID).unwrap_or_default();
        let rating_col = table.column_index(RATING).unwrap_or_default();

        let mut rejected = Vec::new();
        let mut submissions = Vec::with_capacity(table.row_count());

        for (index, row) in table.rows.iter().enumerate() {
            match row[rating_col].trim().parse::<f64>() {
                Ok(r) if r >= self.rules.min_rating && r <= self.rules.max_rating => {
                    submissions.push(Submission {
                        index,
                        key: (
                            DataTable::normalize_key(&row[user_col]),
                            DataTable::normalize_key(&row[movie_col]),
                        ),
                        rating: r,
                    });
                }
                _ => rejected.push(index),
            }
        }

        if !rejected.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::OutOfRange,
                    Severity::Warning,
                    RATING,
                    format!(
                        "Removed {} ratings outside [{}, {}]",
                        rejected.len(),
                        self.rules.min_rating,
                        self.rules.max_rating
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(rejected.len(), table.row_count())
                        .with_sample_rows(rejected)
                        .with_expected(json!({
                            "min": self.rules.min_rating,
                            "max": self.rules.max_rating
                        })),
                )
                .with_rule("rating_range"),
            );
        }

        submissions
    }

    /// Timestamped mode: the latest submission per pair survives.
    fn keep_latest(
        &self,
        table: &DataTable,
        submissions: Vec<Submission>,
        report: &mut CleaningReport,
    ) -> Vec<Vec<String>> {
        let ts_col = table.column_index(TIMESTAMP).unwrap_or_default();
        let total = submissions.len();

        let mut unparseable = Vec::new();
        let mut dated: Vec<(NaiveDateTime, Submission)> = Vec::with_capacity(total);
        for submission in submissions {
            match parse_timestamp(&table.rows[submission.index][ts_col]) {
                Some(ts) => dated.push((ts, submission)),
                None => unparseable.push(submission.index),
            }
        }

        if !unparseable.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::UnparseableValue,
                    Severity::Warning,
                    TIMESTAMP,
                    format!("Removed {} ratings with invalid timestamps", unparseable.len()),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(unparseable.len(), total)
                        .with_sample_rows(unparseable),
                )
                .with_rule("timestamp_parsing"),
            );
        }

        // Ascending by time, then by row so equal timestamps resolve to the later row
        dated.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.index.cmp(&b.1.index)));

        let mut last: HashMap<&(String, String), usize> = HashMap::with_capacity(dated.len());
        for (pos, (_, submission)) in dated.iter().enumerate() {
            last.insert(&submission.key, pos);
        }

        let mut superseded = Vec::new();
        let mut rows = Vec::with_capacity(last.len());
        for (pos, (_, submission)) in dated.iter().enumerate() {
            if last.get(&submission.key) == Some(&pos) {
                rows.push(table.rows[submission.index].clone());
            } else {
                superseded.push(submission.index);
            }
        }

        if !superseded.is_empty() {
            report.observe(
                Observation::new(
                    ObservationType::ConflictResolved,
                    Severity::Info,
                    format!("{}, {}", USER_ID, MOVIE_ID),
                    format!(
                        "Dropped {} older ratings superseded by a later one for the same pair",
                        superseded.len()
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(superseded.len(), dated.len())
                        .with_sample_rows(superseded),
                )
                .with_rule("latest_rating"),
            );
        }

        rows
    }

    /// Untimestamped mode: each pair collapses to its mean rating.
    fn average(
        &self,
        table: &DataTable,
        submissions: Vec<Submission>,
        report: &mut CleaningReport,
    ) -> Vec<Vec<String>> {
        let rating_col = table.column_index(RATING).unwrap_or_default();
        let total = submissions.len();

        // first row index, ratings
        let mut groups: IndexMap<(String, String), (usize, Vec<f64>)> = IndexMap::new();
        for submission in submissions {
            groups
                .entry(submission.key)
                .or_insert_with(|| (submission.index, Vec::new()))
                .1
                .push(submission.rating);
        }

        let mut averaged = Vec::new();
        let mut rows = Vec::with_capacity(groups.len());
        for (first, ratings) in groups.into_values() {
            let mut row = table.rows[first].clone();
            if ratings.len() > 1 {
                let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
                let new_value = format_number(mean, false);
                report.audit(RowAudit {
                    row: first,
                    column: RATING.to_string(),
                    original_value: row[rating_col].clone(),
                    new_value: new_value.clone(),
                    reason: format!(
                        "Mean of {} ratings for the same user and movie",
                        ratings.len()
                    ),
                });
                row[rating_col] = new_value;
                averaged.push(first);
            }
            rows.push(row);
        }

        let folded = total - rows.len();
        if folded > 0 {
            report.observe(
                Observation::new(
                    ObservationType::ConflictResolved,
                    Severity::Info,
                    format!("{}, {}", USER_ID, MOVIE_ID),
                    format!(
                        "Averaged ratings for {} user/movie pairs ({} rows folded)",
                        averaged.len(),
                        folded
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(folded, total)
                        .with_sample_rows(averaged),
                )
                .with_rule("average_rating"),
            );
        }

        rows
    }
}

/// Drop submissions whose key component is absent from an allow-list.
fn filter_references(
    submissions: Vec<Submission>,
    column: &str,
    component: usize,
    known: Option<&HashSet<String>>,
    table: &DataTable,
    report: &mut CleaningReport,
) -> Vec<Submission> {
    let Some(known) = known else {
        return submissions;
    };

    let total = submissions.len();
    let (kept, unknown): (Vec<_>, Vec<_>) = submissions.into_iter().partition(|s| {
        let key = if component == 0 { &s.key.0 } else { &s.key.1 };
        known.contains(key)
    });

    if !unknown.is_empty() {
        let samples: Vec<String> = unknown
            .iter()
            .take(3)
            .map(|s| table.rows[s.index][table.column_index(column).unwrap_or_default()].clone())
            .collect();
        report.observe(
            Observation::new(
                ObservationType::UnknownReference,
                Severity::Warning,
                column,
                format!("Removed {} ratings referencing an unknown {}", unknown.len(), column),
            )
            .with_evidence(
                Evidence::new()
                    .with_value(samples)
                    .with_occurrences(unknown.len(), total)
                    .with_sample_rows(unknown.iter().map(|s| s.index)),
            )
            .with_rule("known_references"),
        );
    }

    kept
}
