use chrono::{Duration, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use gencost::{
    timeseries::{RawPoint, collate, normalize_series},
    types::{BucketDate, ValueMode},
};
use std::hint::black_box;

fn create_test_points(count: usize) -> Vec<RawPoint> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    (0..count)
        .map(|i| {
            RawPoint::new(
                BucketDate::new(base + Duration::days((i / 8) as i64)),
                format!("topic-{}", i % 8),
                (i as f64) * 0.5,
            )
        })
        .collect()
}

fn tracked_keys() -> Vec<String> {
    (0..8).map(|i| format!("topic-{i}")).collect()
}

fn benchmark_collate(c: &mut Criterion) {
    let mut group = c.benchmark_group("collate");

    for count in [100, 1000, 10_000] {
        let points = create_test_points(count);
        group.bench_function(format!("{count}_points"), |b| {
            b.iter(|| {
                let _series = collate(black_box(points.clone()));
            });
        });
    }

    group.finish();
}

fn benchmark_normalize_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_series");
    let keys = tracked_keys();
    let series_end = BucketDate::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

    for count in [100, 1000, 10_000] {
        let series = collate(create_test_points(count));
        group.bench_function(format!("{count}_rows_percentage"), |b| {
            b.iter(|| {
                let _stacked = normalize_series(
                    black_box(series.clone()),
                    &keys,
                    series_end,
                    ValueMode::Percentage,
                )
                .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_collate, benchmark_normalize_series);
criterion_main!(benches);
