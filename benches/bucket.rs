//! # Adaptive Bucket Benchmarks
//!
//! Cost of the admission hot path and of a refill tick, alone and under
//! contention.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use ramper::{AdaptiveTokenBucket, BucketConfig};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Single-threaded admission with tokens available
fn bench_accept(c: &mut Criterion) {
    let mut group = c.benchmark_group("accept");

    for capacity in [100i64, 10_000, 1_000_000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter_batched_ref(
                    || AdaptiveTokenBucket::new(capacity, 0).unwrap(),
                    |bucket| std::hint::black_box(bucket.accept()),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Admission against an empty bucket
fn bench_reject(c: &mut Criterion) {
    let bucket = AdaptiveTokenBucket::new(1, 0).unwrap();
    while bucket.accept() {}

    c.bench_function("reject", |b| b.iter(|| std::hint::black_box(bucket.accept())));
}

/// One ramp + refill step in each ramp direction
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("scale_up", |b| {
        b.iter_batched_ref(
            || {
                let bucket = AdaptiveTokenBucket::new(30_000, 10).unwrap();
                while bucket.accept() {}
                bucket
            },
            |bucket| std::hint::black_box(bucket.tick()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("scale_down", |b| {
        b.iter_batched_ref(
            || AdaptiveTokenBucket::new(30_000, 10).unwrap(),
            |bucket| std::hint::black_box(bucket.tick()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("no_ramp", |b| {
        let bucket = AdaptiveTokenBucket::new(30_000, 0).unwrap();
        b.iter(|| std::hint::black_box(bucket.tick()));
    });

    group.finish();
}

/// Many threads contending for the same bucket lock
fn bench_concurrent_accept(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_accept");

    for num_threads in [2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                b.iter_custom(|iters| {
                    let mut total_duration = Duration::ZERO;

                    for _ in 0..iters {
                        let bucket = Arc::new(AdaptiveTokenBucket::new(1_000_000, 0).unwrap());
                        let start = std::time::Instant::now();

                        let handles: Vec<_> = (0..num_threads)
                            .map(|_| {
                                let bucket = bucket.clone();
                                thread::spawn(move || {
                                    for _ in 0..1000 {
                                        bucket.accept();
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }

                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Admission while the refill thread ticks in the background
fn bench_accept_with_refill_thread(c: &mut Criterion) {
    let config = BucketConfig::new(1_000_000, 1).with_tick_interval_ms(1);
    let bucket = AdaptiveTokenBucket::with_config(config).unwrap();
    bucket.start().unwrap();

    c.bench_function("accept_with_refill_thread", |b| {
        b.iter(|| std::hint::black_box(bucket.accept()))
    });

    bucket.stop();
}

criterion_group!(
    benches,
    bench_accept,
    bench_reject,
    bench_tick,
    bench_concurrent_accept,
    bench_accept_with_refill_thread
);
criterion_main!(benches);
