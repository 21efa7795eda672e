//! Property-based tests for the layout engine.
//!
//! Batches of random full binary trees (with shuffled local ids) are laid
//! out and checked against the structural guarantees a consumer relies on.

use std::collections::HashMap;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use treebatch::testing::{level_fold, random_tree, recursive_fold};
use treebatch::{batch_trees, ChildAddress, Tree, TreeView};

// =============================================================================
// Strategies
// =============================================================================

/// A batch of 1..12 trees with 2..=20 leaves each, built from a seed.
fn arb_batch() -> impl Strategy<Value = Vec<Tree>> {
    (prop::collection::vec(2usize..=20, 1..12), any::<u64>(), 1usize..4).prop_map(
        |(leaves, seed, n_features)| {
            let mut rng = StdRng::seed_from_u64(seed);
            leaves
                .into_iter()
                .map(|n| random_tree(n, n_features, &mut rng, true))
                .collect()
        },
    )
}

/// Depth of every node of a tree, by local id.
fn local_depths(tree: &Tree) -> Vec<usize> {
    let mut depths = vec![0; tree.n_nodes()];
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        depths[node as usize] = depth;
        if let Some([l, r]) = tree.children(node).unwrap() {
            stack.push((l, depth + 1));
            stack.push((r, depth + 1));
        }
    }
    depths
}

fn sum_row(row: ndarray::ArrayView1<'_, f32>) -> f64 {
    row.iter().map(|&x| f64::from(x)).sum()
}

fn mix(row: ndarray::ArrayView1<'_, f32>, left: f64, right: f64) -> f64 {
    sum_row(row) + 3.0 * left - right
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn node_count_is_preserved(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();
        let expected: usize = trees.iter().map(Tree::n_nodes).sum();

        prop_assert_eq!(batch.n_nodes(), expected);
        let listed: usize = batch.levels().iter().map(Vec::len).sum();
        prop_assert_eq!(listed, expected);
        let gathered: usize = batch.all_contents().iter().map(|a| a.nrows()).sum();
        prop_assert_eq!(gathered, expected);
    }

    #[test]
    fn internal_counts_match_per_depth_census(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();

        let mut census: HashMap<usize, usize> = HashMap::new();
        for tree in &trees {
            let depths = local_depths(tree);
            for node in 0..tree.n_nodes() {
                if tree.children(node as u32).unwrap().is_some() {
                    *census.entry(depths[node]).or_default() += 1;
                }
            }
        }

        for depth in 0..batch.n_levels() {
            prop_assert_eq!(batch.n_inner(depth), census.get(&depth).copied().unwrap_or(0));
            for &node in batch.inner_nodes(depth) {
                prop_assert!(batch.child_addresses().get(node).is_some());
            }
            for &node in batch.terminal_nodes(depth) {
                prop_assert!(batch.child_addresses().get(node).is_none());
            }
        }
        prop_assert_eq!(batch.n_inner(batch.n_levels() - 1), 0);
    }

    #[test]
    fn child_addresses_point_into_next_level(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();

        for depth in 0..batch.n_levels() {
            for &node in batch.inner_nodes(depth) {
                let next = batch.level(depth + 1);
                let n_inner_next = batch.n_inner(depth + 1);
                for ChildAddress { position, is_terminal } in batch.child_addresses().get(node).unwrap() {
                    let position = position as usize;
                    prop_assert!(position < next.len());
                    prop_assert_eq!(is_terminal, position >= n_inner_next);
                    prop_assert_eq!(batch.depth_of(next[position]), depth + 1);
                }
            }
        }
    }

    #[test]
    fn gather_then_scatter_restores_content(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();

        let views: Vec<_> = batch.all_contents().iter().map(|a| a.view()).collect();
        let global = batch.scatter(&views).unwrap();
        let per_tree = batch.unbatch(global.view()).unwrap();

        prop_assert_eq!(per_tree.len(), trees.len());
        for (tree, restored) in trees.iter().zip(&per_tree) {
            prop_assert_eq!(restored.view(), tree.content());
        }
    }

    #[test]
    fn layout_is_deterministic(trees in arb_batch()) {
        let first = batch_trees(&trees).unwrap();
        let second = batch_trees(&trees).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn roots_lead_depth_zero(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();

        prop_assert_eq!(batch.n_inner(0), trees.len());
        prop_assert_eq!(batch.level(0).len(), trees.len());
        for (k, range) in batch.tree_ranges().enumerate() {
            let root = batch.root(k) as usize;
            prop_assert!(range.contains(&root));
            prop_assert_eq!(root - range.start, trees[k].root() as usize);
        }
    }

    #[test]
    fn tree_levels_match_tree_depths(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();

        prop_assert_eq!(batch.tree_levels().len(), trees.len());
        for (tree, &levels) in trees.iter().zip(batch.tree_levels()) {
            prop_assert_eq!(levels, tree.depth().unwrap() + 1);
        }
        prop_assert_eq!(batch.tree_levels().iter().copied().max(), Some(batch.n_levels()));
    }

    #[test]
    fn level_fold_agrees_with_recursion(trees in arb_batch()) {
        let batch = batch_trees(&trees).unwrap();
        let batched = level_fold(&batch, &sum_row, &mix).unwrap();

        for (tree, value) in trees.iter().zip(batched) {
            let expected = recursive_fold(tree, &sum_row, &mix).unwrap();
            prop_assert!((value - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        }
    }
}
