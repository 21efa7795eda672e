//! Jet samples: a clustering tree plus the flat set of constituents.

use ndarray::{Array2, ArrayView2};

use crate::repr::{NodeId, Tree, TreeView};

/// One jet.
///
/// The tree is the jet's clustering history; its terminal nodes are the
/// constituents. `constituents` is the unordered particle set used when
/// batching in leaves mode, one row per particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Jet {
    pub tree: Tree,
    pub constituents: Array2<f32>,
}

impl Jet {
    pub fn new(tree: Tree, constituents: Array2<f32>) -> Self {
        Self { tree, constituents }
    }

    /// Build a jet whose constituents are the tree's terminal nodes, in
    /// local id order.
    pub fn from_tree(tree: Tree) -> Self {
        let content = tree.content();
        let terminal: Vec<usize> = (0..tree.n_nodes())
            .filter(|&n| tree.raw_children(n as NodeId)[0] < 0)
            .collect();
        let constituents = content.select(ndarray::Axis(0), &terminal);
        Self { tree, constituents }
    }

    #[inline]
    pub fn n_constituents(&self) -> usize {
        self.constituents.nrows()
    }
}

impl TreeView for Jet {
    #[inline]
    fn n_nodes(&self) -> usize {
        self.tree.n_nodes()
    }

    #[inline]
    fn root(&self) -> NodeId {
        self.tree.root()
    }

    #[inline]
    fn raw_children(&self, node: NodeId) -> [i64; 2] {
        self.tree.raw_children(node)
    }

    #[inline]
    fn content(&self) -> ArrayView2<'_, f32> {
        self.tree.content()
    }
}

/// A labelled, weighted jet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub jet: Jet,
    pub label: u32,
    pub weight: f32,
}

impl Sample {
    pub fn new(jet: Jet, label: u32, weight: f32) -> Self {
        Self { jet, label, weight }
    }
}
