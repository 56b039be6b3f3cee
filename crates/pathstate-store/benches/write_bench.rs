//! Benchmarks for the structural-sharing write path.
//!
//! Run with: cargo bench -p pathstate-store --bench write_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use pathstate_core::{Path, Value};
use pathstate_store::{ChangedPaths, PathStore};

/// A store seeded with `width` top-level branches, each `depth` deep.
fn seeded(width: usize, depth: usize) -> PathStore {
    let store = PathStore::new();
    let mut changed = ChangedPaths::new();
    for branch in 0..width {
        let segments: Vec<String> = std::iter::once(format!("branch{branch}"))
            .chain((0..depth).map(|level| format!("level{level}")))
            .collect();
        changed.insert(
            Path::from_segments(segments).expect("generated segments are valid"),
            branch as i64,
        );
    }
    store.set_paths(changed);
    store
}

fn bench_set_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_path");

    for (width, depth) in [(16, 2), (128, 4), (1024, 6)] {
        let store = seeded(width, depth);
        let target: Path = format!("branch0.{}", (0..depth).map(|l| format!("level{l}"))
            .collect::<Vec<_>>()
            .join("."))
        .parse()
        .expect("valid path");

        group.bench_with_input(
            BenchmarkId::new("deep_leaf", format!("{width}x{depth}")),
            &(),
            |b, _| {
                b.iter(|| store.set_path(black_box(target.clone()), black_box(1)));
            },
        );
    }

    group.finish();
}

fn bench_set_paths_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_paths/batch10");

    let store = seeded(128, 4);
    let batch: ChangedPaths = (0..10)
        .map(|branch| {
            (
                format!("branch{branch}.level0.level1")
                    .parse::<Path>()
                    .expect("valid path"),
                Value::Int(branch),
            )
        })
        .collect();

    group.bench_function("apply", |b| {
        b.iter(|| store.set_paths(black_box(batch.clone())));
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    let store = seeded(1024, 6);
    let present: Path = "branch512.level0.level1.level2.level3.level4.level5"
        .parse()
        .expect("valid path");

    group.bench_function("present_deep", |b| {
        b.iter(|| black_box(store.get(black_box(&present))));
    });

    group.finish();
}

criterion_group!(benches, bench_set_path, bench_set_paths_batch, bench_get);
criterion_main!(benches);
