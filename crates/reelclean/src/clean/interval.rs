//! Overlapping-interval merge for one key's spans.

use serde::{Deserialize, Serialize};

/// A closed interval `[start, end]` carrying an optional amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span<T> {
    /// Inclusive start.
    pub start: T,
    /// Inclusive end.
    pub end: T,
    /// Amount attached to the span, summed on merge.
    pub amount: Option<f64>,
    /// Index of the source row that seeded this span.
    pub row: usize,
    /// Number of input spans folded into this one.
    pub sources: usize,
}

impl<T: Ord + Copy> Span<T> {
    /// Create a span seeded by a single source row.
    pub fn new(start: T, end: T, amount: Option<f64>, row: usize) -> Self {
        Self {
            start,
            end,
            amount,
            row,
            sources: 1,
        }
    }

    /// True if `other` starts no later than this span ends. Touching counts.
    pub fn reaches(&self, other: &Span<T>) -> bool {
        other.start <= self.end
    }

    /// Fold `other` into this span.
    fn absorb(&mut self, other: Span<T>) {
        self.end = self.end.max(other.end);
        self.amount = match (self.amount, other.amount) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.sources += other.sources;
    }
}

/// Coalesce overlapping or touching spans into disjoint ones.
///
/// Spans are ordered by start, ties by source row, so the seed row of every
/// merged span is deterministic. A single left-to-right sweep follows: a span
/// that starts at or before the accumulator's end extends it (end = max of
/// both ends, amounts summed); anything else closes the accumulator.
///
/// The output is sorted by start and consecutive spans satisfy
/// `next.start > prev.end`.
pub fn merge_spans<T: Ord + Copy>(mut spans: Vec<Span<T>>) -> Vec<Span<T>> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(a.row.cmp(&b.row)));

    let mut merged = Vec::with_capacity(spans.len());
    let mut iter = spans.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for span in iter {
        if current.reaches(&span) {
            current.absorb(span);
        } else {
            merged.push(std::mem::replace(&mut current, span));
        }
    }
    merged.push(current);

    merged
}
