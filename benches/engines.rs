//! Lookup and resize benchmarks for the bucket engines.
//!
//! - `bench_lookup`: `get_bucket` on a fresh engine, per algorithm and size
//! - `bench_lookup_after_removals`: Memento lookups with a share of buckets removed
//! - `bench_remove_restore`: one removal followed by its restore
//!
//! Run with: `cargo bench --bench engines`

use aspen_bucket_hash::Algorithm;
use aspen_bucket_hash::BucketEngine;
use aspen_bucket_hash::HashFunction;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

/// Keys looked up per benchmark iteration.
const KEYS_PER_ITER: usize = 1_000;

/// Engine sizes exercised by every benchmark.
const SIZES: [u32; 3] = [10, 1_000, 100_000];

fn sample_keys() -> Vec<Vec<u8>> {
    (0..KEYS_PER_ITER).map(|i| format!("bench_key_{}", i).into_bytes()).collect()
}

fn lookup_all(engine: &dyn BucketEngine, keys: &[Vec<u8>]) -> u64 {
    keys.iter().map(|k| u64::from(engine.get_bucket(k))).sum()
}

fn bench_lookup(c: &mut Criterion) {
    let keys = sample_keys();
    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(KEYS_PER_ITER as u64));

    for algorithm in Algorithm::ALL {
        for size in SIZES {
            let engine = algorithm.build(size, HashFunction::Xxh3).expect("engine");
            group.bench_with_input(BenchmarkId::new(algorithm.name(), size), &size, |b, _| {
                b.iter(|| black_box(lookup_all(engine.as_ref(), &keys)))
            });
        }
    }
    group.finish();
}

fn bench_lookup_after_removals(c: &mut Criterion) {
    let keys = sample_keys();
    let size = 10_000u32;
    let mut group = c.benchmark_group("lookup_after_removals");
    group.throughput(Throughput::Elements(KEYS_PER_ITER as u64));

    for algorithm in [Algorithm::Memento, Algorithm::Recall] {
        for removed_percent in [10u32, 50, 90] {
            let mut engine = algorithm.build(size, HashFunction::Xxh3).expect("engine");
            // Remove every bucket whose index is below the threshold modulo 100,
            // scattering removals over the whole range.
            for bucket in (0..size).filter(|b| b % 100 < removed_percent) {
                engine.remove_bucket(bucket).expect("remove");
            }
            group.bench_with_input(BenchmarkId::new(algorithm.name(), removed_percent), &removed_percent, |b, _| {
                b.iter(|| black_box(lookup_all(engine.as_ref(), &keys)))
            });
        }
    }
    group.finish();
}

fn bench_remove_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_restore");

    for algorithm in [Algorithm::Memento, Algorithm::Recall] {
        for size in SIZES {
            let mut engine = algorithm.build(size, HashFunction::Xxh3).expect("engine");
            let victim = size / 2;
            group.bench_with_input(BenchmarkId::new(algorithm.name(), size), &size, |b, _| {
                b.iter(|| {
                    engine.remove_bucket(black_box(victim)).expect("remove");
                    engine.add_bucket().expect("restore")
                })
            });
        }
    }
    for algorithm in [Algorithm::Jump, Algorithm::Binomial] {
        for size in SIZES {
            let mut engine = algorithm.build(size, HashFunction::Xxh3).expect("engine");
            group.bench_with_input(BenchmarkId::new(algorithm.name(), size), &size, |b, _| {
                b.iter(|| {
                    let bucket = engine.add_bucket().expect("add");
                    engine.remove_bucket(black_box(bucket)).expect("remove")
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lookup, bench_lookup_after_removals, bench_remove_restore);
criterion_main!(benches);
