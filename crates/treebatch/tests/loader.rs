//! End-to-end loading: JSON records to collated, prefetched mini-batches.

use approx::assert_relative_eq;
use ndarray::{s, Axis};
use rstest::rstest;

use treebatch::io::{read_jets_json, write_jets_json};
use treebatch::testing::random_samples;
use treebatch::{BatchMode, JetLoader, LoaderConfig, Sample, TreeView};

fn dataset(n: usize) -> Vec<Sample> {
    let samples = random_samples(n, 12, 3, 9);
    let mut buf = Vec::new();
    write_jets_json(&samples, &mut buf).unwrap();
    read_jets_json(buf.as_slice()).unwrap()
}

#[test]
fn json_round_trip_keeps_trees() {
    let original = random_samples(6, 12, 3, 9);
    let loaded = dataset(6);
    assert_eq!(loaded.len(), original.len());
    for (a, b) in loaded.iter().zip(&original) {
        assert_eq!(a.jet.tree, b.jet.tree);
        assert_eq!(a.label, b.label);
        assert_relative_eq!(a.weight, b.weight);
    }
}

#[rstest]
#[case(10, 4, false, 3)]
#[case(10, 4, true, 2)]
#[case(8, 8, false, 1)]
#[case(3, 5, true, 0)]
fn batch_counts(#[case] n: usize, #[case] batch_size: usize, #[case] drop_last: bool, #[case] expected: usize) {
    let config = LoaderConfig::builder()
        .batch_size(batch_size)
        .drop_last(drop_last)
        .build()
        .unwrap();
    let loader = JetLoader::new(dataset(n), config);
    assert_eq!(loader.len(), expected);
    assert_eq!(loader.iter_epoch(0).count(), expected);
}

#[test]
fn tree_mode_batches_cover_every_tree() {
    let config = LoaderConfig::builder()
        .batch_size(4)
        .shuffle(true)
        .weight_batches(true)
        .build()
        .unwrap();
    let loader = JetLoader::new(dataset(10), config);

    let mut n_trees = 0;
    let mut n_nodes = 0;
    for batch in loader.iter_epoch(1) {
        let batch = batch.unwrap();
        let trees = batch.inputs.as_trees().unwrap();
        assert_eq!(trees.n_trees(), batch.len());
        assert_eq!(batch.weights.as_ref().map(|w| w.len()), Some(batch.len()));
        n_trees += trees.n_trees();
        n_nodes += trees.n_nodes();
    }

    let expected: usize = loader.samples().iter().map(|s| s.jet.n_nodes()).sum();
    assert_eq!(n_trees, 10);
    assert_eq!(n_nodes, expected);
}

#[test]
fn leaves_mode_pads_with_realness_channel() {
    let config = LoaderConfig::builder()
        .batch_size(5)
        .mode(BatchMode::Leaves)
        .permute_particles(true)
        .dropout(0.3)
        .build()
        .unwrap();
    let loader = JetLoader::new(dataset(5), config);
    assert_eq!(loader.dim(), Some(4));

    let batch = loader.iter_epoch(0).next().unwrap().unwrap();
    let leaves = batch.inputs.as_leaves().unwrap();
    assert_eq!(leaves.dim(), 4);

    for (i, &len) in leaves.lengths.iter().enumerate() {
        assert!(len >= 1);
        let jet = leaves.data.index_axis(Axis(0), i);
        assert!(jet.slice(s![..len, 3]).iter().all(|&x| x == 1.0));
        assert!(jet.slice(s![len.., ..]).iter().all(|&x| x == 0.0));

        let mask = leaves.mask.index_axis(Axis(0), i);
        let real: f32 = mask.sum();
        assert_relative_eq!(real, (len * len) as f32);
    }
}

#[test]
fn prefetched_epoch_equals_sequential_epoch() {
    let config = LoaderConfig::builder()
        .batch_size(3)
        .shuffle(true)
        .prefetch(2)
        .build()
        .unwrap();
    let loader = JetLoader::new(dataset(20), config);

    let sequential: Vec<_> = loader.iter_epoch(3).map(Result::unwrap).collect();
    let prefetched: Vec<_> = loader.prefetch(3).map(Result::unwrap).collect();
    assert_eq!(prefetched, sequential);
}

#[test]
fn parallel_epoch_equals_sequential_epoch() {
    let config = LoaderConfig::builder()
        .batch_size(4)
        .shuffle(true)
        .mode(BatchMode::Leaves)
        .dropout(0.5)
        .n_threads(3)
        .build()
        .unwrap();
    let loader = JetLoader::new(dataset(17), config);

    let sequential: Vec<_> = loader.iter_epoch(0).collect();
    let parallel = loader.collect_epoch(0).unwrap();
    assert_eq!(parallel, sequential);
}
