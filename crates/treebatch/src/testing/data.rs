use rand::prelude::*;

use ndarray::Array2;

use crate::data::{Jet, Sample};
use crate::repr::{NodeId, Tree, NO_CHILD};

/// Generate random node content in `[min, max]`, one row per node.
pub fn random_content(rows: usize, cols: usize, rng: &mut impl Rng, min: f32, max: f32) -> Array2<f32> {
    assert!(max >= min);
    let width = max - min;
    Array2::from_shape_simple_fn((rows, cols), || min + rng.r#gen::<f32>() * width)
}

/// Generate a random full binary tree with `n_leaves` terminal nodes.
///
/// Grown by repeatedly splitting a uniformly chosen leaf, so shapes range
/// from balanced to caterpillar. With `shuffle_ids`, local ids are permuted
/// so the root is usually not node 0.
pub fn random_tree(n_leaves: usize, n_features: usize, rng: &mut impl Rng, shuffle_ids: bool) -> Tree {
    assert!(n_leaves >= 2, "trees need at least one internal node");

    let mut children: Vec<[i64; 2]> = vec![[NO_CHILD, NO_CHILD]];
    let mut leaves: Vec<usize> = vec![0];
    while leaves.len() < n_leaves {
        let node = leaves.swap_remove(rng.gen_range(0..leaves.len()));
        let left = children.len();
        children.push([NO_CHILD, NO_CHILD]);
        children.push([NO_CHILD, NO_CHILD]);
        children[node] = [left as i64, left as i64 + 1];
        leaves.push(left);
        leaves.push(left + 1);
    }

    let n_nodes = children.len();
    let mut new_id: Vec<usize> = (0..n_nodes).collect();
    if shuffle_ids {
        new_id.shuffle(rng);
    }

    let mut pairs = vec![[NO_CHILD, NO_CHILD]; n_nodes];
    for (old, pair) in children.iter().enumerate() {
        pairs[new_id[old]] = pair.map(|c| if c == NO_CHILD { NO_CHILD } else { new_id[c as usize] as i64 });
    }

    let flat: Vec<i64> = pairs.iter().flatten().copied().collect();
    let table = Array2::from_shape_vec((n_nodes, 2), flat).expect("n_nodes x 2 table");
    let content = random_content(n_nodes, n_features, rng, -1.0, 1.0);
    Tree::new(new_id[0] as NodeId, table, content).expect("generated tree is well-formed")
}

/// Generate a batch of random trees with `2..=max_leaves` leaves each.
pub fn random_batch(n_trees: usize, max_leaves: usize, n_features: usize, seed: u64) -> Vec<Tree> {
    assert!(max_leaves >= 2);
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_trees)
        .map(|_| {
            let n_leaves = rng.gen_range(2..=max_leaves);
            random_tree(n_leaves, n_features, &mut rng, true)
        })
        .collect()
}

/// Generate labelled jets whose constituents are their tree's terminal rows.
///
/// Labels alternate 0/1; weights are uniform in `[0.5, 1.5]`.
pub fn random_samples(n: usize, max_leaves: usize, n_features: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5A4D_91E5);
    random_batch(n, max_leaves, n_features, seed)
        .into_iter()
        .enumerate()
        .map(|(i, tree)| {
            let weight = 0.5 + rng.r#gen::<f32>();
            Sample::new(Jet::from_tree(tree), (i % 2) as u32, weight)
        })
        .collect()
}
