//! Error types for tree batching.
//!
//! - [`MalformedTreeError`]: a single tree's declared structure is inconsistent
//! - [`BatchError`]: a whole mini-batch could not be laid out
//!
//! Failures are fatal for the batch that produced them. The engine never drops
//! or substitutes trees; the caller decides whether to skip or re-sample.

use crate::repr::NodeId;

/// Structural problems found in a single tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedTreeError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    Empty,

    /// The child table is not `[n_nodes, 2]` or disagrees with the content rows.
    #[error("child table has shape {children:?} but content has {content_rows} rows")]
    ShapeMismatch {
        children: [usize; 2],
        content_rows: usize,
    },

    /// The root id does not address a node.
    #[error("root {root} is out of bounds for {n_nodes} nodes")]
    RootOutOfBounds { root: i64, n_nodes: usize },

    /// A child id references a node outside the tree.
    #[error("{side} child {child} of node {node} is out of bounds for {n_nodes} nodes")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: i64,
        n_nodes: usize,
    },

    /// A node has exactly one child.
    #[error("node {node} has exactly one child")]
    IncompleteSplit { node: NodeId },

    /// The root has no children; depth 0 would have no internal nodes.
    #[error("root {root} is terminal, trees need at least one internal node")]
    TerminalRoot { root: NodeId },

    /// Traversal visited more nodes than the tree holds.
    #[error("traversal exceeded {n_nodes} nodes, cycle through node {node}")]
    CycleDetected { node: NodeId, n_nodes: usize },

    /// A node was reached by more than one path.
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },

    /// A node exists in storage but is unreachable from the root.
    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },

    /// Feature width differs from the rest of the batch.
    #[error("content width {got} differs from batch width {expected}")]
    ContentWidthMismatch { expected: usize, got: usize },
}

/// Errors that abort layout construction for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// The batch contains no trees.
    #[error("cannot lay out an empty batch")]
    EmptyBatch,

    /// One of the trees in the batch is malformed.
    #[error("tree {tree} is malformed: {source}")]
    MalformedTree {
        tree: usize,
        #[source]
        source: MalformedTreeError,
    },

    /// A later stage found a value an earlier stage should have ruled out.
    #[error("layout inconsistency: {0}")]
    Inconsistent(String),

    /// Array shape construction failed.
    #[error("shape error: {0}")]
    Shape(String),
}

impl BatchError {
    pub(crate) fn malformed(tree: usize, source: MalformedTreeError) -> Self {
        Self::MalformedTree { tree, source }
    }

    /// Index of the offending tree, if the error is attributable to one.
    pub fn tree_index(&self) -> Option<usize> {
        match self {
            Self::MalformedTree { tree, .. } => Some(*tree),
            _ => None,
        }
    }
}

impl From<ndarray::ShapeError> for BatchError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::Shape(e.to_string())
    }
}
