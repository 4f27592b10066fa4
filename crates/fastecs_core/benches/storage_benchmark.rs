//! # Storage Benchmark
//!
//! Insert, read and compaction costs of both storage forms.
//!
//! Run with: `cargo bench --package fastecs_core --bench storage_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fastecs_core::{
    Component, ComponentId, ComponentInfo, ComponentRegistry, EntityId, HeaderLayout, PackedStore,
    Storage, TableStorage,
};

#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Position {
    const ID: ComponentId = 0;
}

#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}
impl Component for Velocity {
    const ID: ComponentId = 1;
}

fn populate<S: Storage>(count: u64) -> S {
    let mut storage = S::with_layout(HeaderLayout::default());
    for raw in 0..count {
        let id = EntityId::new(raw);
        storage.spawn(id).unwrap();
        storage.insert(id, Position::default()).unwrap();
        if raw % 2 == 0 {
            storage.insert(id, Velocity { x: 1.0, y: 0.0, z: 0.0 }).unwrap();
        }
    }
    storage
}

/// Benchmark: spawn + two inserts per entity.
fn bench_populate(c: &mut Criterion) {
    let mut group = c.benchmark_group("populate");
    for count in [1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::new("table", count), &count, |b, &count| {
            b.iter(|| black_box(populate::<TableStorage>(count).entity_count()));
        });
        group.bench_with_input(BenchmarkId::new("packed", count), &count, |b, &count| {
            b.iter(|| black_box(populate::<PackedStore>(count).entity_count()));
        });
    }
    group.finish();
}

/// Benchmark: read every position once.
fn bench_read(c: &mut Criterion) {
    let table = populate::<TableStorage>(10_000);
    let packed = populate::<PackedStore>(10_000);

    c.bench_function("read_table_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for id in table.ids_with(Position::ID) {
                sum += table.read::<Position>(id).unwrap().unwrap_or_default().x;
            }
            black_box(sum)
        });
    });

    c.bench_function("read_packed_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for id in packed.ids_with(Position::ID) {
                sum += packed.read::<Position>(id).unwrap().unwrap_or_default().x;
            }
            black_box(sum)
        });
    });
}

/// Benchmark: compact a store where half the velocities were removed.
fn bench_compact(c: &mut Criterion) {
    let info = ComponentInfo::of::<Velocity>();
    let registry = ComponentRegistry::new();
    let mut fragmented = populate::<PackedStore>(10_000);
    for raw in (0..10_000).step_by(4) {
        fragmented.remove(EntityId::new(raw), &info).unwrap();
    }
    for raw in (1..10_000).step_by(10) {
        fragmented.despawn(EntityId::new(raw), &registry).unwrap();
    }

    c.bench_function("compact_packed_10k", |b| {
        b.iter_batched(
            || fragmented.clone(),
            |mut store| black_box(store.compact()),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_populate, bench_read, bench_compact);
criterion_main!(benches);
