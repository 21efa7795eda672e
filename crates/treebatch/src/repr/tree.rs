//! Tree storage and read-only tree interface.
//!
//! - [`Tree`]: owned arena tree (root id, child table, node content)
//! - [`TreeView`]: read-only trait the layout engine is generic over

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use super::{NodeId, NO_CHILD};
use crate::error::MalformedTreeError;

// ============================================================================
// TreeView Trait
// ============================================================================

/// Read-only view of a binary tree in arena form.
///
/// Implemented for [`Tree`] and for anything that carries one (e.g. a jet
/// sample), so the layout engine can batch caller-owned data without copying
/// it first.
///
/// Node ids are local to the tree: `0..n_nodes()`.
pub trait TreeView {
    /// Number of nodes in the tree.
    fn n_nodes(&self) -> usize;

    /// Local id of the root node.
    fn root(&self) -> NodeId;

    /// Raw `(left, right)` child ids of a node, [`NO_CHILD`] when absent.
    fn raw_children(&self, node: NodeId) -> [i64; 2];

    /// Node content matrix, one row per node.
    fn content(&self) -> ArrayView2<'_, f32>;

    /// Width of each node's feature vector.
    fn n_features(&self) -> usize {
        self.content().ncols()
    }

    /// Feature vector of a single node.
    fn node_content(&self, node: NodeId) -> ArrayView1<'_, f32> {
        self.content().index_axis_move(Axis(0), node as usize)
    }

    /// Resolved children of a node, or `None` for a terminal node.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedTreeError`] if a child is out of range or only one
    /// child is present.
    fn children(&self, node: NodeId) -> Result<Option<[NodeId; 2]>, MalformedTreeError> {
        resolve_children(node, self.raw_children(node), self.n_nodes())
    }
}

/// Resolve a raw child pair against a node count.
pub(crate) fn resolve_children(
    node: NodeId,
    [left, right]: [i64; 2],
    n_nodes: usize,
) -> Result<Option<[NodeId; 2]>, MalformedTreeError> {
    let in_range = |side: &'static str, child: i64| {
        if child < 0 || child as u64 >= n_nodes as u64 {
            Err(MalformedTreeError::ChildOutOfBounds {
                node,
                side,
                child,
                n_nodes,
            })
        } else {
            Ok(child as NodeId)
        }
    };

    match (left == NO_CHILD, right == NO_CHILD) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some([in_range("left", left)?, in_range("right", right)?])),
        _ => {
            // Report a bogus id before the arity problem.
            if left != NO_CHILD {
                in_range("left", left)?;
            }
            if right != NO_CHILD {
                in_range("right", right)?;
            }
            Err(MalformedTreeError::IncompleteSplit { node })
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Owned binary tree in arena form.
///
/// `children[[i, 0]]` / `children[[i, 1]]` hold the left/right child of node
/// `i` (or [`NO_CHILD`]), and `content.row(i)` is node `i`'s feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    root: NodeId,
    children: Array2<i64>,
    content: Array2<f32>,
}

impl Tree {
    /// Create a tree from its parts.
    ///
    /// Checks array shapes and the root id only. Child ids are checked when
    /// the tree is batched, or eagerly with [`Tree::validate`].
    pub fn new(
        root: NodeId,
        children: Array2<i64>,
        content: Array2<f32>,
    ) -> Result<Self, MalformedTreeError> {
        let n_nodes = children.nrows();
        if children.ncols() != 2 || content.nrows() != n_nodes {
            return Err(MalformedTreeError::ShapeMismatch {
                children: [children.nrows(), children.ncols()],
                content_rows: content.nrows(),
            });
        }
        if n_nodes == 0 {
            return Err(MalformedTreeError::Empty);
        }
        if root as usize >= n_nodes {
            return Err(MalformedTreeError::RootOutOfBounds {
                root: i64::from(root),
                n_nodes,
            });
        }

        Ok(Self {
            root,
            children,
            content,
        })
    }

    /// Create a tree from `(left, right)` pairs and row-major content.
    pub fn from_pairs(
        root: NodeId,
        pairs: &[[i64; 2]],
        content: Vec<f32>,
        n_features: usize,
    ) -> Result<Self, MalformedTreeError> {
        let flat: Vec<i64> = pairs.iter().flatten().copied().collect();
        let children = Array2::from_shape_vec((pairs.len(), 2), flat).map_err(|_| {
            MalformedTreeError::ShapeMismatch {
                children: [pairs.len(), 2],
                content_rows: 0,
            }
        })?;
        let rows = if n_features == 0 { pairs.len() } else { content.len() / n_features };
        let content = Array2::from_shape_vec((rows, n_features), content).map_err(|_| {
            MalformedTreeError::ShapeMismatch {
                children: [pairs.len(), 2],
                content_rows: rows,
            }
        })?;
        Self::new(root, children, content)
    }

    /// The raw `[n_nodes, 2]` child table.
    #[inline]
    pub fn child_table(&self) -> ArrayView2<'_, i64> {
        self.children.view()
    }

    /// Take the tree apart.
    pub fn into_parts(self) -> (NodeId, Array2<i64>, Array2<f32>) {
        (self.root, self.children, self.content)
    }

    /// Number of internal (two-child) nodes.
    pub fn n_internal(&self) -> usize {
        self.children
            .rows()
            .into_iter()
            .filter(|row| row[0] != NO_CHILD)
            .count()
    }

    /// Length of the longest root-to-leaf path, in edges.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedTreeError`] on a bad child id, a one-child node, or
    /// a node reached twice (cycle or shared child).
    pub fn depth(&self) -> Result<usize, MalformedTreeError> {
        let n_nodes = self.n_nodes();
        let mut seen = vec![false; n_nodes];
        let mut max_depth = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if std::mem::replace(&mut seen[node as usize], true) {
                return Err(MalformedTreeError::CycleDetected { node, n_nodes });
            }
            max_depth = max_depth.max(depth);
            if let Some([left, right]) = self.children(node)? {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        Ok(max_depth)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate structural invariants required for batching.
    ///
    /// Checks child ranges and arity, that the root is internal, that the
    /// structure is a tree (no cycles, no shared nodes), and that every node
    /// is reachable from the root.
    pub fn validate(&self) -> Result<(), MalformedTreeError> {
        let n_nodes = self.n_nodes();
        if self.children(self.root)?.is_none() {
            return Err(MalformedTreeError::TerminalRoot { root: self.root });
        }

        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, bool)> = vec![(self.root, false)];

        while let Some((node, expanded)) = stack.pop() {
            let idx = node as usize;
            if expanded {
                color[idx] = 2;
                continue;
            }
            match color[idx] {
                0 => {}
                1 => return Err(MalformedTreeError::CycleDetected { node, n_nodes }),
                _ => return Err(MalformedTreeError::DuplicateVisit { node }),
            }
            color[idx] = 1;
            stack.push((node, true));

            if let Some([left, right]) = self.children(node)? {
                stack.push((right, false));
                stack.push((left, false));
            }
        }

        if let Some(node) = color.iter().position(|&c| c == 0) {
            return Err(MalformedTreeError::UnreachableNode { node: node as NodeId });
        }

        Ok(())
    }
}

impl TreeView for Tree {
    #[inline]
    fn n_nodes(&self) -> usize {
        self.children.nrows()
    }

    #[inline]
    fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    fn raw_children(&self, node: NodeId) -> [i64; 2] {
        let row = self.children.row(node as usize);
        [row[0], row[1]]
    }

    #[inline]
    fn content(&self) -> ArrayView2<'_, f32> {
        self.content.view()
    }
}

impl<T: TreeView + ?Sized> TreeView for &T {
    fn n_nodes(&self) -> usize {
        (**self).n_nodes()
    }

    fn root(&self) -> NodeId {
        (**self).root()
    }

    fn raw_children(&self, node: NodeId) -> [i64; 2] {
        (**self).raw_children(node)
    }

    fn content(&self) -> ArrayView2<'_, f32> {
        (**self).content()
    }
}
