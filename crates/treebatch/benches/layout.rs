//! Layout throughput benchmarks.
//!
//! Run with: `cargo bench --bench layout`

mod common;

use common::criterion_config::default_criterion;

use treebatch::testing::{random_batch, random_samples};
use treebatch::{batch_trees, JetLoader, LoaderConfig, Parallelism, Tree, TreeBatcher, TreeView};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Typical jets have tens of constituents.
const MAX_LEAVES: usize = 40;
const N_FEATURES: usize = 7;

// =============================================================================
// Single Batch
// =============================================================================

fn bench_batch_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/batch_trees");

    for batch_size in [1usize, 10, 100, 1_000] {
        let trees = random_batch(batch_size, MAX_LEAVES, N_FEATURES, 42);
        let n_nodes: usize = trees.iter().map(Tree::n_nodes).sum();
        group.throughput(Throughput::Elements(n_nodes as u64));

        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &trees, |b, trees| {
            b.iter(|| black_box(batch_trees(black_box(trees)).unwrap()))
        });
    }

    group.finish();
}

// =============================================================================
// Many Batches
// =============================================================================

fn bench_batch_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/batch_many");

    let batches: Vec<Vec<Tree>> = (0..32)
        .map(|i| random_batch(100, MAX_LEAVES, N_FEATURES, i))
        .collect();
    group.throughput(Throughput::Elements(batches.len() as u64));

    for (name, parallelism) in [
        ("sequential", Parallelism::Sequential),
        ("parallel", Parallelism::Parallel),
    ] {
        let batcher = TreeBatcher::new(parallelism);
        group.bench_function(name, |b| {
            b.iter(|| black_box(batcher.batch_many::<Tree, _>(black_box(&batches))))
        });
    }

    group.finish();
}

// =============================================================================
// Loader Epoch
// =============================================================================

fn bench_loader_epoch(c: &mut Criterion) {
    let mut group = c.benchmark_group("loader/epoch");
    let samples = random_samples(2_000, MAX_LEAVES, N_FEATURES, 7);

    for prefetch in [false, true] {
        let config = LoaderConfig::builder()
            .batch_size(100)
            .shuffle(true)
            .build()
            .unwrap();
        let loader = JetLoader::new(samples.clone(), config);
        let name = if prefetch { "prefetch" } else { "sequential" };

        group.bench_function(name, |b| {
            b.iter(|| {
                let n = if prefetch {
                    loader.prefetch(0).filter(Result::is_ok).count()
                } else {
                    loader.iter_epoch(0).filter(Result::is_ok).count()
                };
                black_box(n)
            })
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = default_criterion();
    targets = bench_batch_trees, bench_batch_many, bench_loader_epoch
}
criterion_main!(benches);
