//! Benchmarks for profiling the same table on each backend.

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use profunda::prelude::*;
use profunda::test_fixtures::{correlated, customers, frames};
use tokio::runtime::Runtime;

fn profiler() -> Profiler {
    Profiler::builder()
        .registry(DispatchRegistry::with_builtin())
        .build()
        .unwrap()
}

fn bench_describe_per_backend(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let frames = rt.block_on(frames(&correlated(10_000), 8)).unwrap();
    let profiler = profiler();

    let mut group = c.benchmark_group("describe_per_backend");
    group.measurement_time(Duration::from_secs(10));
    for frame in &frames {
        group.bench_with_input(
            BenchmarkId::new("correlated_10k", frame.backend()),
            frame,
            |b, frame| b.iter(|| rt.block_on(profiler.describe(black_box(frame)))),
        );
    }
    group.finish();
}

fn bench_describe_1d(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let frames = rt.block_on(frames(&customers(), 2)).unwrap();
    let profiler = profiler();

    let mut group = c.benchmark_group("describe_1d");
    for frame in &frames {
        for name in ["age", "city", "joined"] {
            let column = frame.column(name).unwrap();
            group.bench_with_input(
                BenchmarkId::new(name, frame.backend()),
                &column,
                |b, column| b.iter(|| rt.block_on(profiler.describe_1d(black_box(column)))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_describe_per_backend, bench_describe_1d);
criterion_main!(benches);
