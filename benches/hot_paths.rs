//! Hot path benchmarks for profiling-driven optimization.
//!
//! Run with: `cargo bench --bench hot_paths`
//! Compare baselines: `cargo bench --bench hot_paths -- --baseline main`
//!
//! Covers the per-event sketch update, point queries, snapshot encoding
//! and a domain add with the save it triggers (info record per event, or
//! nothing when deferred) against in-memory storage.

use cml_domain::config::{DEFAULT_DELTA, DEFAULT_EPSILON};
use cml_domain::sketch::CountMinLogSketch;
use cml_domain::{
    Counter, DomainOptions, DomainType, FrequencyDomain, InMemoryStorage, Info, SavePolicy,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

fn populated(epsilon: f64, delta: f64, events: usize) -> CountMinLogSketch {
    let mut sketch = CountMinLogSketch::with_seed(epsilon, delta, 42).unwrap();
    for i in 0..events {
        sketch.increase_count(format!("key:{}", i % 1000).as_bytes());
    }
    sketch
}

/// Benchmark CountMinLogSketch::increase_count across sketch shapes
fn bench_increase_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("increase_count");
    group.throughput(Throughput::Elements(1));

    for (name, epsilon, delta) in [
        ("default", DEFAULT_EPSILON, DEFAULT_DELTA),
        ("eps_0.001_delta_0.01", 0.001, 0.01),
        ("eps_0.0001_delta_0.0001", 0.0001, 0.0001),
    ] {
        group.bench_function(name, |b| {
            let mut sketch = CountMinLogSketch::with_seed(epsilon, delta, 1).unwrap();
            let mut i = 0u64;
            b.iter(|| {
                i = i.wrapping_add(1);
                sketch.increase_count(black_box(&(i % 10_000).to_le_bytes()))
            })
        });
    }

    // Hot key: cells climb high enough that most updates are skipped
    group.bench_function("hot_key", |b| {
        let mut sketch = CountMinLogSketch::with_seed(0.001, 0.01, 1).unwrap();
        b.iter(|| sketch.increase_count(black_box(b"hot")))
    });

    group.finish();
}

/// Benchmark CountMinLogSketch::get_count
fn bench_get_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_count");
    group.throughput(Throughput::Elements(1));

    let sketch = populated(0.001, 0.01, 100_000);
    group.bench_function("hit", |b| {
        b.iter(|| sketch.get_count(black_box(b"key:500")))
    });
    group.bench_function("miss", |b| {
        b.iter(|| sketch.get_count(black_box(b"never-inserted")))
    });

    group.finish();
}

/// Benchmark snapshot encoding, sparse and dense
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    let sparse = populated(DEFAULT_EPSILON, DEFAULT_DELTA, 10_000);
    group.throughput(Throughput::Elements((sparse.width() * sparse.depth()) as u64));
    group.bench_function("to_bytes_sparse_default", |b| {
        b.iter(|| black_box(&sparse).to_bytes().unwrap())
    });

    let mut dense = CountMinLogSketch::with_dimensions(4096, 4, 7).unwrap();
    for i in 0..200_000u32 {
        dense.increase_count(&i.to_le_bytes());
    }
    let bytes = dense.to_bytes().unwrap();
    group.throughput(Throughput::Elements((dense.width() * dense.depth()) as u64));
    group.bench_function("to_bytes_dense", |b| {
        b.iter(|| black_box(&dense).to_bytes().unwrap())
    });
    group.bench_function("from_bytes_dense", |b| {
        b.iter(|| CountMinLogSketch::from_bytes(black_box(&bytes), 0).unwrap())
    });

    group.finish();
}

/// Benchmark FrequencyDomain::add including the save it triggers
fn bench_domain_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain_add");
    group.throughput(Throughput::Elements(1));

    for (name, policy) in [
        ("save_every_mutation", SavePolicy::EveryMutation),
        ("save_deferred", SavePolicy::Threshold(Duration::from_secs(3600))),
    ] {
        let domain = FrequencyDomain::create(
            Info::new(name, DomainType::Frequency),
            Arc::new(InMemoryStorage::new()),
            DomainOptions {
                epsilon: 0.001,
                delta: 0.01,
                save_policy: policy,
                seed: Some(3),
            },
        )
        .unwrap();
        group.bench_function(name, |b| {
            b.iter(|| domain.add(black_box(b"page:/index.html")).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_increase_count,
    bench_get_count,
    bench_snapshot,
    bench_domain_add,
);
criterion_main!(benches);
