use ndarray::ArrayView1;

use crate::error::{BatchError, MalformedTreeError};
use crate::layout::TreeBatch;
use crate::repr::{NodeId, TreeView};

/// Fold one tree bottom-up by plain recursion, returning the root's value.
///
/// `leaf` sees a terminal node's content; `inner` sees an internal node's
/// content and the values of its left and right children.
pub fn recursive_fold<T, L, I>(tree: &T, leaf: &L, inner: &I) -> Result<f64, MalformedTreeError>
where
    T: TreeView,
    L: Fn(ArrayView1<'_, f32>) -> f64,
    I: Fn(ArrayView1<'_, f32>, f64, f64) -> f64,
{
    fn visit<T, L, I>(tree: &T, node: NodeId, leaf: &L, inner: &I) -> Result<f64, MalformedTreeError>
    where
        T: TreeView,
        L: Fn(ArrayView1<'_, f32>) -> f64,
        I: Fn(ArrayView1<'_, f32>, f64, f64) -> f64,
    {
        match tree.children(node)? {
            None => Ok(leaf(tree.node_content(node))),
            Some([left, right]) => {
                let l = visit(tree, left, leaf, inner)?;
                let r = visit(tree, right, leaf, inner)?;
                Ok(inner(tree.node_content(node), l, r))
            }
        }
    }

    visit(tree, tree.root(), leaf, inner)
}

/// Fold a whole batch one depth at a time, deepest first.
///
/// Returns one value per tree, read at the root positions of depth 0. Every
/// node is evaluated from its level's content row and, for internal nodes,
/// the already computed values of the next depth at its child addresses.
///
/// # Errors
///
/// Returns [`BatchError::Inconsistent`] if an internal node has no child
/// addresses or an address points past the next level.
pub fn level_fold<L, I>(batch: &TreeBatch, leaf: &L, inner: &I) -> Result<Vec<f64>, BatchError>
where
    L: Fn(ArrayView1<'_, f32>) -> f64,
    I: Fn(ArrayView1<'_, f32>, f64, f64) -> f64,
{
    let addresses = batch.child_addresses();
    let mut below: Vec<f64> = Vec::new();

    for depth in (0..batch.n_levels()).rev() {
        let content = batch.contents(depth);
        let n_inner = batch.n_inner(depth);
        let current = batch
            .level(depth)
            .iter()
            .enumerate()
            .map(|(j, &node)| {
                let row = content.row(j);
                if j >= n_inner {
                    return Ok(leaf(row));
                }
                let [l, r] = addresses.get(node).ok_or_else(|| {
                    BatchError::Inconsistent(format!("internal node {node} has no child addresses"))
                })?;
                let value = |position: u32| {
                    below.get(position as usize).copied().ok_or_else(|| {
                        BatchError::Inconsistent(format!(
                            "node {node} addresses position {position} past depth {}",
                            depth + 1
                        ))
                    })
                };
                Ok(inner(row, value(l.position)?, value(r.position)?))
            })
            .collect::<Result<Vec<f64>, BatchError>>()?;
        below = current;
    }

    Ok(batch.root_positions().map(|k| below[k]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::batch_trees;
    use crate::repr::Tree;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn sum(row: ArrayView1<'_, f32>) -> f64 {
        row.iter().map(|&x| f64::from(x)).sum()
    }

    fn combine(row: ArrayView1<'_, f32>, l: f64, r: f64) -> f64 {
        sum(row) + 2.0 * l - 0.5 * r
    }

    #[test]
    fn recursive_fold_on_stump() {
        let tree = Tree::new(0, array![[1, 2], [-1, -1], [-1, -1]], array![[1.0], [2.0], [4.0]]).unwrap();
        let value = recursive_fold(&tree, &sum, &combine).unwrap();
        assert_relative_eq!(value, 1.0 + 4.0 - 2.0);
    }

    #[test]
    fn level_fold_matches_recursion() {
        let trees = vec![
            Tree::new(0, array![[1, 2], [-1, -1], [-1, -1]], array![[1.0], [2.0], [4.0]]).unwrap(),
            Tree::new(
                0,
                array![[1, 2], [3, 4], [-1, -1], [-1, -1], [-1, -1]],
                array![[0.5], [1.5], [-1.0], [3.0], [0.25]],
            )
            .unwrap(),
        ];
        let batch = batch_trees(&trees).unwrap();
        let batched = level_fold(&batch, &sum, &combine).unwrap();
        for (tree, value) in trees.iter().zip(batched) {
            assert_relative_eq!(value, recursive_fold(tree, &sum, &combine).unwrap(), epsilon = 1e-9);
        }
    }
}
