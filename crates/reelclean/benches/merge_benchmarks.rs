//! Subscription merge benchmarks.
//!
//! Measures the span merge alone and the full subscription cleaner.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reelclean::clean::{merge_spans, Span, SubscriptionCleaner};
use reelclean::DataTable;

/// Generate overlapping spans, roughly half of which chain into their neighbour.
fn generate_spans(count: usize) -> Vec<Span<i64>> {
    (0..count)
        .map(|i| {
            let start = (i as i64) * 7;
            let len = if i % 2 == 0 { 10 } else { 3 };
            Span::new(start, start + len, Some((i % 50) as f64), i)
        })
        .collect()
}

/// Generate a subscription table with `users` users and `per_user` periods each.
fn generate_subscriptions(users: usize, per_user: usize) -> DataTable {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut rows = Vec::with_capacity(users * per_user);
    for user in 0..users {
        for period in 0..per_user {
            let start = base + Duration::days((period * 20 + user % 5) as i64);
            let end = start + Duration::days(if period % 3 == 0 { 30 } else { 10 });
            rows.push(vec![
                user.to_string(),
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
                format!("{}.99", period % 20),
            ]);
        }
    }
    DataTable::new(
        vec![
            "user_id".to_string(),
            "start_date".to_string(),
            "end_date".to_string(),
            "amount_paid".to_string(),
        ],
        rows,
        b',',
    )
}

fn bench_merge_spans(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_spans");

    for count in [100, 1_000, 10_000].iter() {
        let spans = generate_spans(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("spans", count), &spans, |b, spans| {
            b.iter_with_setup(|| spans.clone(), |input| merge_spans(black_box(input)))
        });
    }

    group.finish();
}

fn bench_subscription_cleaner(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription_cleaner");
    let cleaner = SubscriptionCleaner::new();

    for users in [10, 100, 1_000].iter() {
        let table = generate_subscriptions(*users, 12);
        group.throughput(Throughput::Elements(table.row_count() as u64));
        group.bench_with_input(BenchmarkId::new("users", users), &table, |b, table| {
            b.iter_with_setup(|| table.clone(), |input| cleaner.clean(black_box(input)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_spans, bench_subscription_cleaner);
criterion_main!(benches);
