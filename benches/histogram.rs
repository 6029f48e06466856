use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pgdriver_bench::LatencyHistogram;
use std::time::Duration;

// The record path runs once per benchmark iteration across every worker,
// so it has to stay trivially cheap relative to a network round trip.

fn bench_record(c: &mut Criterion) {
    c.bench_function("histogram_record", |b| {
        let mut hist = LatencyHistogram::for_timeout(Duration::from_secs(2));
        b.iter(|| hist.record(black_box(Duration::from_micros(1375))));
    });
}

fn bench_merge(c: &mut Criterion) {
    c.bench_function("histogram_merge", |b| {
        let mut left = LatencyHistogram::for_timeout(Duration::from_secs(2));
        let mut right = LatencyHistogram::for_timeout(Duration::from_secs(2));
        for i in 0..1000u64 {
            right.record(Duration::from_micros(i * 7 % 20_000));
        }
        b.iter(|| left.merge(black_box(&right)));
    });
}

criterion_group!(benches, bench_record, bench_merge);
criterion_main!(benches);
