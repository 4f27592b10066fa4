//! # Merge Join Benchmark
//!
//! Intersection cost over id sequences of varying overlap.
//!
//! Run with: `cargo bench --package fastecs_core --bench join_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fastecs_core::{EntityId, MergeJoin};

fn every(step: u64, count: u64) -> Vec<EntityId> {
    (0..count).step_by(step as usize).map(EntityId::new).collect()
}

/// Benchmark: 2-way and 4-way joins over 100k ids.
fn bench_join(c: &mut Criterion) {
    const COUNT: u64 = 100_000;
    let inputs = [every(1, COUNT), every(2, COUNT), every(3, COUNT), every(5, COUNT)];

    let mut group = c.benchmark_group("merge_join");
    for ways in [2usize, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(ways), &ways, |b, &ways| {
            b.iter(|| {
                let join = MergeJoin::new(inputs[..ways].iter().map(|v| v.iter().copied()));
                black_box(join.count())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_join);
criterion_main!(benches);
