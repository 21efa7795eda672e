//! Merge per-tree node ids into one batch-wide address space.
//!
//! Tree `k` is assigned an offset equal to the number of nodes in trees
//! `0..k`. Every node id of tree `k` (and every child reference inside it) is
//! shifted by that offset, so global ids are contiguous and never overlap.

use std::ops::Range;

use ndarray::{s, Array2, ArrayView2};

use crate::error::{BatchError, MalformedTreeError};
use crate::repr::tree::resolve_children;
use crate::repr::{NodeId, TreeView, NO_CHILD};

/// All trees of a batch, merged into global ids.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedForest {
    /// `[n_nodes, 2]` child table in global ids, [`NO_CHILD`] for terminal nodes.
    children: Array2<i64>,
    /// `[n_nodes, n_features]` node content, row = global id.
    content: Array2<f32>,
    /// Global id of each tree's root.
    roots: Vec<NodeId>,
    /// `offsets[k]..offsets[k + 1]` is tree `k`'s global id range.
    offsets: Vec<usize>,
}

impl MergedForest {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.children.nrows()
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.roots.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.content.ncols()
    }

    #[inline]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Tree offsets, `n_trees + 1` entries starting at 0.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Global id range owned by tree `k`.
    #[inline]
    pub fn tree_range(&self, tree: usize) -> Range<usize> {
        self.offsets[tree]..self.offsets[tree + 1]
    }

    #[inline]
    pub fn children_table(&self) -> ArrayView2<'_, i64> {
        self.children.view()
    }

    #[inline]
    pub fn content(&self) -> ArrayView2<'_, f32> {
        self.content.view()
    }

    /// Children of a global node, `None` for terminal nodes.
    ///
    /// Child ids were range-checked while merging.
    #[inline]
    pub fn children(&self, node: NodeId) -> Option<[NodeId; 2]> {
        let row = self.children.row(node as usize);
        if row[0] == NO_CHILD {
            None
        } else {
            Some([row[0] as NodeId, row[1] as NodeId])
        }
    }
}

/// Merge a batch of trees into one global address space.
///
/// # Errors
///
/// - [`BatchError::EmptyBatch`] if `trees` is empty
/// - [`BatchError::MalformedTree`] if a tree has no nodes, an out-of-range
///   root or child id, a one-child node, or a feature width different from
///   the first tree
pub fn reindex<T: TreeView>(trees: &[T]) -> Result<MergedForest, BatchError> {
    let first = trees.first().ok_or(BatchError::EmptyBatch)?;
    let n_features = first.n_features();

    let mut offsets = Vec::with_capacity(trees.len() + 1);
    offsets.push(0usize);
    for (k, tree) in trees.iter().enumerate() {
        let n = tree.n_nodes();
        if n == 0 {
            return Err(BatchError::malformed(k, MalformedTreeError::Empty));
        }
        if tree.root() as usize >= n {
            return Err(BatchError::malformed(
                k,
                MalformedTreeError::RootOutOfBounds {
                    root: i64::from(tree.root()),
                    n_nodes: n,
                },
            ));
        }
        if tree.n_features() != n_features {
            return Err(BatchError::malformed(
                k,
                MalformedTreeError::ContentWidthMismatch {
                    expected: n_features,
                    got: tree.n_features(),
                },
            ));
        }
        let content_rows = tree.content().nrows();
        if content_rows != n {
            return Err(BatchError::malformed(
                k,
                MalformedTreeError::ShapeMismatch {
                    children: [n, 2],
                    content_rows,
                },
            ));
        }
        offsets.push(offsets[k] + n);
    }

    let n_nodes = offsets[trees.len()];
    if n_nodes > NodeId::MAX as usize {
        return Err(BatchError::Inconsistent(format!(
            "batch of {n_nodes} nodes does not fit in 32-bit node ids"
        )));
    }

    let mut children = Array2::from_elem((n_nodes, 2), NO_CHILD);
    let mut content = Array2::<f32>::zeros((n_nodes, n_features));
    let mut roots = Vec::with_capacity(trees.len());

    for (k, tree) in trees.iter().enumerate() {
        let offset = offsets[k];
        let n = tree.n_nodes();

        for local in 0..n as NodeId {
            let resolved = resolve_children(local, tree.raw_children(local), n)
                .map_err(|e| BatchError::malformed(k, e))?;
            if let Some([left, right]) = resolved {
                let mut row = children.row_mut(offset + local as usize);
                row[0] = (left as usize + offset) as i64;
                row[1] = (right as usize + offset) as i64;
            }
        }

        content
            .slice_mut(s![offset..offset + n, ..])
            .assign(&tree.content());
        roots.push((tree.root() as usize + offset) as NodeId);
    }

    tracing::debug!(
        n_trees = trees.len(),
        n_nodes,
        n_features,
        "reindexed batch into global node ids"
    );

    Ok(MergedForest {
        children,
        content,
        roots,
        offsets,
    })
}
