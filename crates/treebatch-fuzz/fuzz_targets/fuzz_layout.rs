//! Fuzz target for the layout engine.
//!
//! Arbitrary bytes are decoded into a batch of child tables (including
//! cycles, shared children, dangling ids and one-child nodes). Layout must
//! either succeed with a consistent result or return an error, never panic.
//!
//! Run with:
//! ```sh
//! cargo +nightly fuzz run fuzz_layout
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use ndarray::Array2;

use treebatch::{batch_trees, Tree, TreeView};

const MAX_NODES: usize = 64;

/// Decode one tree: a node count, a root, then one byte per child id.
fn decode_tree(data: &mut &[u8]) -> Option<Tree> {
    let (&n, rest) = data.split_first()?;
    let n = (n as usize % MAX_NODES) + 1;
    let (&root, rest) = rest.split_first()?;
    if rest.len() < 2 * n {
        return None;
    }
    let (ids, rest) = rest.split_at(2 * n);
    *data = rest;

    // 0xFF is the absent-child sentinel; everything else may be out of range.
    let children = ids
        .iter()
        .map(|&b| if b == 0xFF { -1 } else { i64::from(b) })
        .collect();
    let children = Array2::from_shape_vec((n, 2), children).ok()?;
    let content = Array2::from_shape_fn((n, 1), |(i, _)| i as f32);
    Tree::new(u32::from(root) % n as u32, children, content).ok()
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = data;
    let mut trees = Vec::new();
    while let Some(tree) = decode_tree(&mut cursor) {
        trees.push(tree);
    }

    if let Ok(batch) = batch_trees(&trees) {
        let expected: usize = trees.iter().map(Tree::n_nodes).sum();
        assert_eq!(batch.n_nodes(), expected);
        for depth in 0..batch.n_levels() {
            for &node in batch.inner_nodes(depth) {
                let [l, r] = batch.child_addresses().get(node).unwrap();
                assert!((l.position as usize) < batch.level(depth + 1).len());
                assert!((r.position as usize) < batch.level(depth + 1).len());
            }
        }
    }
});
