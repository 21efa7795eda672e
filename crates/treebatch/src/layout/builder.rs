//! Level layout: one ordered node sequence per depth plus final child addresses.
//!
//! Each depth's sequence is its internal nodes (all trees, tree order)
//! followed by its terminal nodes. Raw child positions from discovery are
//! relative to the child's class list, so a terminal child's final position
//! is its raw position plus the internal count *of the child's depth*.
//! Internal children keep their raw position.
//!
//! The corrected addresses are written to a fresh table; the raw table from
//! discovery is never modified.

use ndarray::Array2;

use super::levels::{ChildAddress, LevelDiscovery};
use crate::error::BatchError;
use crate::repr::{NodeId, NO_CHILD};

// =============================================================================
// ChildAddressTable
// =============================================================================

/// Final child addresses, indexed by global node id.
///
/// Internal nodes map to `[left, right]` addresses within the next depth's
/// sequence. Terminal nodes have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildAddressTable {
    slots: Vec<Option<[ChildAddress; 2]>>,
}

impl ChildAddressTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// `[left, right]` addresses of an internal node, `None` for terminal nodes.
    #[inline]
    pub fn get(&self, node: NodeId) -> Option<[ChildAddress; 2]> {
        self.slots.get(node as usize).copied().flatten()
    }

    #[inline]
    pub fn left(&self, node: NodeId) -> Option<ChildAddress> {
        self.get(node).map(|[left, _]| left)
    }

    #[inline]
    pub fn right(&self, node: NodeId) -> Option<ChildAddress> {
        self.get(node).map(|[_, right]| right)
    }

    /// Iterate `(node, [left, right])` over internal nodes in global id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, [ChildAddress; 2])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(node, slot)| slot.map(|s| (node as NodeId, s)))
    }

    /// Dense `[n_nodes, 2]` position table, [`NO_CHILD`] for terminal nodes.
    ///
    /// This is the shape a tensor consumer indexes by global node id.
    pub fn to_position_array(&self) -> Array2<i64> {
        let mut out = Array2::from_elem((self.slots.len(), 2), NO_CHILD);
        for (node, [left, right]) in self.iter() {
            let mut row = out.row_mut(node as usize);
            row[0] = i64::from(left.position);
            row[1] = i64::from(right.position);
        }
        out
    }
}

// =============================================================================
// LevelLayout
// =============================================================================

/// Per-depth sequences, segment boundaries and final child addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLayout {
    /// `levels[d]` = internal nodes then terminal nodes at depth `d`.
    pub levels: Vec<Vec<NodeId>>,
    /// `n_inners[d]` = length of the internal segment of `levels[d]`.
    pub n_inners: Vec<usize>,
    /// Final child addresses.
    pub addresses: ChildAddressTable,
}

/// Build the per-depth layout from discovery output.
///
/// Depths are processed in increasing order. Once depth `d` is assembled,
/// the addresses of depth `d - 1`'s internal nodes are resolved against it.
///
/// # Errors
///
/// Returns [`BatchError::Inconsistent`] if an internal node lacks raw
/// addresses, a resolved position falls outside the next level, or the
/// deepest level contains internal nodes.
pub fn build_levels(discovery: &LevelDiscovery) -> Result<LevelLayout, BatchError> {
    let n_levels = discovery.n_levels();
    let mut levels = Vec::with_capacity(n_levels);
    let mut n_inners = Vec::with_capacity(n_levels);
    let mut resolved: Vec<Option<[ChildAddress; 2]>> = vec![None; discovery.raw_addresses.len()];

    let mut prev_internal: &[NodeId] = &[];
    for (depth, partition) in discovery.partitions.iter().enumerate() {
        let n_inner = partition.internal.len();
        let mut level = Vec::with_capacity(partition.len());
        level.extend_from_slice(&partition.internal);
        level.extend_from_slice(&partition.terminal);

        for &parent in prev_internal {
            let raw = discovery.raw_addresses[parent as usize].ok_or_else(|| {
                BatchError::Inconsistent(format!("internal node {parent} has no raw addresses"))
            })?;
            let fixed = raw.map(|addr| final_address(addr, n_inner));
            for addr in fixed {
                if addr.position as usize >= level.len() {
                    return Err(BatchError::Inconsistent(format!(
                        "child of node {parent} resolved to position {} of {} at depth {depth}",
                        addr.position,
                        level.len()
                    )));
                }
            }
            resolved[parent as usize] = Some(fixed);
        }

        levels.push(level);
        n_inners.push(n_inner);
        prev_internal = partition.internal.as_slice();
    }

    if !prev_internal.is_empty() {
        return Err(BatchError::Inconsistent(format!(
            "{} internal nodes at the deepest level",
            prev_internal.len()
        )));
    }

    tracing::debug!(n_levels, ?n_inners, "built level layout");

    Ok(LevelLayout {
        levels,
        n_inners,
        addresses: ChildAddressTable { slots: resolved },
    })
}

/// Shift a terminal child past the internal segment of its own level.
#[inline]
fn final_address(raw: ChildAddress, child_level_inner: usize) -> ChildAddress {
    if raw.is_terminal {
        ChildAddress::terminal(raw.position + child_level_inner as u32)
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::levels::discover_levels;
    use crate::layout::reindex::reindex;
    use crate::repr::Tree;
    use ndarray::{array, Array2};

    fn tree(children: Array2<i64>) -> Tree {
        let n = children.nrows();
        Tree::new(0, children, Array2::zeros((n, 1))).unwrap()
    }

    fn layout_of(trees: &[Tree]) -> LevelLayout {
        let merged = reindex(trees).unwrap();
        let found = discover_levels(&merged).unwrap();
        build_levels(&found).unwrap()
    }

    #[test]
    fn stump_layout() {
        let layout = layout_of(&[tree(array![[1, 2], [-1, -1], [-1, -1]])]);

        assert_eq!(layout.levels, vec![vec![0], vec![1, 2]]);
        assert_eq!(layout.n_inners, vec![1, 0]);
        assert_eq!(
            layout.addresses.get(0),
            Some([ChildAddress::terminal(0), ChildAddress::terminal(1)])
        );
        assert_eq!(layout.addresses.get(1), None);
    }

    #[test]
    fn terminal_children_shift_by_child_level_internal_count() {
        //       0
        //     /   \
        //    1     2
        //   / \   / \
        //  3   4 5   6
        //       / \
        //      7   8
        // Depth 2: internal [5], terminal [3, 4, 6].
        let t = tree(array![
            [1, 2],
            [3, 4],
            [5, 6],
            [-1, -1],
            [-1, -1],
            [7, 8],
            [-1, -1],
            [-1, -1],
            [-1, -1]
        ]);
        let layout = layout_of(&[t]);

        assert_eq!(layout.levels[2], vec![5, 3, 4, 6]);
        assert_eq!(layout.n_inners, vec![1, 2, 1, 0]);
        assert_eq!(
            layout.addresses.get(1),
            Some([ChildAddress::terminal(1), ChildAddress::terminal(2)])
        );
        assert_eq!(
            layout.addresses.get(2),
            Some([ChildAddress::internal(0), ChildAddress::terminal(3)])
        );
        assert_eq!(
            layout.addresses.get(5),
            Some([ChildAddress::terminal(0), ChildAddress::terminal(1)])
        );
    }

    #[test]
    fn position_array_marks_terminals() {
        let layout = layout_of(&[tree(array![[1, 2], [-1, -1], [-1, -1]])]);
        assert_eq!(layout.addresses.to_position_array(), array![[0, 1], [-1, -1], [-1, -1]]);
    }

    #[test]
    fn inconsistent_deepest_level_is_rejected() {
        let merged = reindex(&[tree(array![[1, 2], [-1, -1], [-1, -1]])]).unwrap();
        let mut found = discover_levels(&merged).unwrap();
        found.partitions.pop();
        assert!(matches!(build_levels(&found), Err(BatchError::Inconsistent(_))));
    }
}
