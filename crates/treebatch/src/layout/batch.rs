//! Batch driver and the published layout.
//!
//! [`batch_trees`] runs the four stages in order (reindex, discover levels,
//! build layout, gather content) and either returns a complete [`TreeBatch`]
//! or an error. No partial layout is ever returned.

use std::ops::Range;

use ndarray::{s, Array2, ArrayView2};

use super::builder::{build_levels, ChildAddressTable};
use super::gather::{gather_levels, scatter_levels};
use super::levels::discover_levels;
use super::reindex::reindex;
use crate::error::BatchError;
use crate::repr::{NodeId, TreeView};
use crate::utils::Parallelism;

// =============================================================================
// TreeBatch
// =============================================================================

/// Level-synchronized layout of a batch of trees.
///
/// Depth 0 holds the roots; depth increases toward the leaves. Within each
/// depth, `level(d)[..n_inner(d)]` are internal nodes and the rest are
/// terminal nodes. For an internal node at depth `d`, its child addresses
/// index into `level(d + 1)` and into `contents(d + 1)`.
///
/// A bottom-up consumer walks depths from deepest to 0: terminal rows are
/// computed from content alone, internal rows gather their children's
/// results from the level below via [`TreeBatch::child_addresses`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeBatch {
    levels: Vec<Vec<NodeId>>,
    n_inners: Vec<usize>,
    addresses: ChildAddressTable,
    contents: Vec<Array2<f32>>,
    depths: Vec<u32>,
    tree_levels: Vec<usize>,
    offsets: Vec<usize>,
    n_features: usize,
}

impl TreeBatch {
    /// Number of trees in the batch.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total node count over all trees.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.depths.len()
    }

    /// Number of depths (max tree depth + 1).
    #[inline]
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Width of each node's feature vector.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Global node ids at depth `d`, internal segment first.
    #[inline]
    pub fn level(&self, depth: usize) -> &[NodeId] {
        &self.levels[depth]
    }

    #[inline]
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    /// Length of the internal segment at depth `d`.
    #[inline]
    pub fn n_inner(&self, depth: usize) -> usize {
        self.n_inners[depth]
    }

    #[inline]
    pub fn n_inners(&self) -> &[usize] {
        &self.n_inners
    }

    /// Internal node ids at depth `d`.
    #[inline]
    pub fn inner_nodes(&self, depth: usize) -> &[NodeId] {
        &self.levels[depth][..self.n_inners[depth]]
    }

    /// Terminal node ids at depth `d`.
    #[inline]
    pub fn terminal_nodes(&self, depth: usize) -> &[NodeId] {
        &self.levels[depth][self.n_inners[depth]..]
    }

    /// Final child addresses, indexed by global node id.
    #[inline]
    pub fn child_addresses(&self) -> &ChildAddressTable {
        &self.addresses
    }

    /// Node content at depth `d`, row `j` belongs to `level(d)[j]`.
    #[inline]
    pub fn contents(&self, depth: usize) -> ArrayView2<'_, f32> {
        self.contents[depth].view()
    }

    #[inline]
    pub fn all_contents(&self) -> &[Array2<f32>] {
        &self.contents
    }

    /// Depth of a global node.
    #[inline]
    pub fn depth_of(&self, node: NodeId) -> usize {
        self.depths[node as usize] as usize
    }

    /// Number of levels tree `k` occupies (its depth + 1).
    ///
    /// Tree `k` has no nodes in `level(d)` for `d >= tree_levels()[k]`.
    #[inline]
    pub fn tree_levels(&self) -> &[usize] {
        &self.tree_levels
    }

    /// Tree offsets into the global id space, `n_trees + 1` entries.
    #[inline]
    pub fn tree_offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Global id range of each tree.
    pub fn tree_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets.windows(2).map(|w| w[0]..w[1])
    }

    /// Global id of tree `k`'s root.
    ///
    /// Roots are internal, so tree `k`'s root is `level(0)[k]`.
    #[inline]
    pub fn root(&self, tree: usize) -> NodeId {
        self.levels[0][tree]
    }

    /// Positions of the roots within depth 0, in tree order.
    ///
    /// A consumer that produced one row per depth-0 node reads per-tree
    /// outputs at these positions.
    pub fn root_positions(&self) -> Range<usize> {
        0..self.n_trees()
    }

    /// Write per-level arrays back to global id order.
    ///
    /// `per_level[d]` must have `level(d).len()` rows.
    pub fn scatter(&self, per_level: &[ArrayView2<'_, f32>]) -> Result<Array2<f32>, BatchError> {
        scatter_levels(&self.levels, per_level, self.n_nodes())
    }

    /// Split a global-order array into one array per tree.
    pub fn unbatch(&self, global: ArrayView2<'_, f32>) -> Result<Vec<Array2<f32>>, BatchError> {
        if global.nrows() != self.n_nodes() {
            return Err(BatchError::Inconsistent(format!(
                "unbatch of {} rows for {} nodes",
                global.nrows(),
                self.n_nodes()
            )));
        }
        Ok(self
            .tree_ranges()
            .map(|r| global.slice(s![r, ..]).to_owned())
            .collect())
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Lay out one batch of trees.
///
/// # Errors
///
/// - [`BatchError::EmptyBatch`] for an empty slice
/// - [`BatchError::MalformedTree`] naming the first offending tree
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use treebatch::layout::{batch_trees, ChildAddress};
/// use treebatch::repr::Tree;
///
/// let tree = Tree::new(
///     0,
///     array![[1, 2], [-1, -1], [-1, -1]],
///     array![[0.0], [1.0], [2.0]],
/// )
/// .unwrap();
///
/// let batch = batch_trees(&[tree]).unwrap();
/// assert_eq!(batch.level(0), &[0]);
/// assert_eq!(batch.level(1), &[1, 2]);
/// assert_eq!(
///     batch.child_addresses().get(0),
///     Some([ChildAddress::terminal(0), ChildAddress::terminal(1)])
/// );
/// ```
pub fn batch_trees<T: TreeView>(trees: &[T]) -> Result<TreeBatch, BatchError> {
    let merged = reindex(trees)?;
    let discovery = discover_levels(&merged)?;
    let layout = build_levels(&discovery)?;
    let contents = gather_levels(&layout.levels, merged.content())?;

    tracing::debug!(
        n_trees = merged.n_trees(),
        n_nodes = merged.n_nodes(),
        n_levels = layout.levels.len(),
        "tree batch ready"
    );

    Ok(TreeBatch {
        levels: layout.levels,
        n_inners: layout.n_inners,
        addresses: layout.addresses,
        contents,
        depths: discovery.depths,
        tree_levels: discovery.tree_levels,
        offsets: merged.offsets().to_vec(),
        n_features: merged.n_features(),
    })
}

/// Lays out batches, optionally several at once.
///
/// Each batch runs all four stages on a single worker; parallelism only
/// spreads independent batches across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeBatcher {
    parallelism: Parallelism,
}

impl TreeBatcher {
    pub fn new(parallelism: Parallelism) -> Self {
        Self { parallelism }
    }

    #[inline]
    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Lay out one batch.
    #[inline]
    pub fn batch<T: TreeView>(&self, trees: &[T]) -> Result<TreeBatch, BatchError> {
        batch_trees(trees)
    }

    /// Lay out independent batches. Results are in input order; a failing
    /// batch does not affect the others.
    pub fn batch_many<T, B>(&self, batches: &[B]) -> Vec<Result<TreeBatch, BatchError>>
    where
        T: TreeView,
        B: AsRef<[T]> + Sync,
    {
        self.parallelism
            .maybe_par_map(batches, |trees| batch_trees(trees.as_ref()))
    }
}
