//! Breadth-first level discovery.
//!
//! Each tree is traversed from its root with a FIFO work queue. Every visited
//! node is classified internal or terminal and appended to the matching list
//! for its depth. Lists are shared by all trees and filled in input tree
//! order, so within a depth the nodes of tree `k` precede those of tree
//! `k + 1`, and within one tree nodes appear in breadth-first order.
//!
//! When a node is appended, its index in that list is recorded in its
//! parent's slot of the raw address table, together with its class. Terminal
//! positions are still relative to the terminal list here; the layout builder
//! shifts them once the depth's internal count is final.

use std::collections::VecDeque;

use super::reindex::MergedForest;
use crate::error::{BatchError, MalformedTreeError};
use crate::repr::NodeId;

/// Where a child lands in the next level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChildAddress {
    /// Position within the next level (raw or final, depending on the table).
    pub position: u32,
    /// Whether the child is a terminal node.
    pub is_terminal: bool,
}

impl ChildAddress {
    #[inline]
    pub const fn internal(position: u32) -> Self {
        Self {
            position,
            is_terminal: false,
        }
    }

    #[inline]
    pub const fn terminal(position: u32) -> Self {
        Self {
            position,
            is_terminal: true,
        }
    }
}

/// Nodes of one depth, split by class, in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelPartition {
    pub internal: Vec<NodeId>,
    pub terminal: Vec<NodeId>,
}

impl LevelPartition {
    #[inline]
    pub fn len(&self) -> usize {
        self.internal.len() + self.terminal.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output of level discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDiscovery {
    /// One partition per depth, depth 0 = roots.
    pub partitions: Vec<LevelPartition>,
    /// Per global node: for internal nodes, each child's class and its
    /// position within that class's list at the next depth.
    pub raw_addresses: Vec<Option<[ChildAddress; 2]>>,
    /// Per global node: depth below its tree's root.
    pub depths: Vec<u32>,
    /// Per tree: number of levels (max depth + 1).
    pub tree_levels: Vec<usize>,
}

impl LevelDiscovery {
    #[inline]
    pub fn n_levels(&self) -> usize {
        self.partitions.len()
    }
}

struct QueueItem {
    node: NodeId,
    parent: Option<NodeId>,
    is_left: bool,
    depth: usize,
}

/// Discover depths, classes and raw child positions for every node.
///
/// # Errors
///
/// Returns [`BatchError::MalformedTree`] (with tree-local node ids) when a
/// root is terminal, when traversal revisits a node (cycle or shared child),
/// or when a node is unreachable from its tree's root.
pub fn discover_levels(forest: &MergedForest) -> Result<LevelDiscovery, BatchError> {
    let n_nodes = forest.n_nodes();
    let mut partitions: Vec<LevelPartition> = Vec::new();
    let mut raw_addresses: Vec<Option<[ChildAddress; 2]>> = vec![None; n_nodes];
    let mut depths = vec![0u32; n_nodes];
    let mut parent_of: Vec<Option<NodeId>> = vec![None; n_nodes];
    let mut visited = vec![false; n_nodes];
    let mut tree_levels = Vec::with_capacity(forest.n_trees());
    let mut queue = VecDeque::new();

    for (k, &root) in forest.roots().iter().enumerate() {
        let range = forest.tree_range(k);
        let offset = range.start as NodeId;

        if forest.children(root).is_none() {
            return Err(BatchError::malformed(
                k,
                MalformedTreeError::TerminalRoot { root: root - offset },
            ));
        }

        queue.clear();
        queue.push_back(QueueItem {
            node: root,
            parent: None,
            is_left: true,
            depth: 0,
        });
        let mut n_visited = 0usize;
        let mut max_depth = 0usize;

        while let Some(item) = queue.pop_front() {
            let node = item.node;
            let idx = node as usize;

            if visited[idx] {
                let err = if is_ancestor(&parent_of, node, item.parent) {
                    MalformedTreeError::CycleDetected {
                        node: node - offset,
                        n_nodes: range.len(),
                    }
                } else {
                    MalformedTreeError::DuplicateVisit { node: node - offset }
                };
                return Err(BatchError::malformed(k, err));
            }
            visited[idx] = true;
            parent_of[idx] = item.parent;
            depths[idx] = item.depth as u32;
            n_visited += 1;
            max_depth = max_depth.max(item.depth);

            if partitions.len() < item.depth + 1 {
                partitions.resize_with(item.depth + 1, LevelPartition::default);
            }
            let level = &mut partitions[item.depth];

            let address = match forest.children(node) {
                Some([left, right]) => {
                    level.internal.push(node);
                    raw_addresses[idx] = Some([ChildAddress::default(); 2]);
                    queue.push_back(QueueItem {
                        node: left,
                        parent: Some(node),
                        is_left: true,
                        depth: item.depth + 1,
                    });
                    queue.push_back(QueueItem {
                        node: right,
                        parent: Some(node),
                        is_left: false,
                        depth: item.depth + 1,
                    });
                    ChildAddress::internal((level.internal.len() - 1) as u32)
                }
                None => {
                    level.terminal.push(node);
                    ChildAddress::terminal((level.terminal.len() - 1) as u32)
                }
            };

            if let Some(parent) = item.parent {
                let slots = raw_addresses[parent as usize].as_mut().ok_or_else(|| {
                    BatchError::Inconsistent(format!("parent {parent} has no address slots"))
                })?;
                slots[usize::from(!item.is_left)] = address;
            }
        }

        if n_visited != range.len() {
            // Visited nodes stay inside the tree's range, so a shortfall means
            // something in the range was never reached.
            if let Some(missing) = range.clone().find(|&g| !visited[g]) {
                return Err(BatchError::malformed(
                    k,
                    MalformedTreeError::UnreachableNode {
                        node: (missing - range.start) as NodeId,
                    },
                ));
            }
        }
        tree_levels.push(max_depth + 1);
    }

    tracing::debug!(
        n_levels = partitions.len(),
        n_nodes,
        "discovered levels"
    );

    Ok(LevelDiscovery {
        partitions,
        raw_addresses,
        depths,
        tree_levels,
    })
}

/// Whether `node` lies on the parent chain starting at `from`.
fn is_ancestor(parent_of: &[Option<NodeId>], node: NodeId, from: Option<NodeId>) -> bool {
    let mut cursor = from;
    let mut steps = 0usize;
    while let Some(current) = cursor {
        if current == node {
            return true;
        }
        steps += 1;
        if steps > parent_of.len() {
            return false;
        }
        cursor = parent_of[current as usize];
    }
    false
}
