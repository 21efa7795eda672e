//! Gather node content into per-level arrays, and scatter it back.

use ndarray::{Array2, ArrayView2};

use crate::error::BatchError;
use crate::repr::NodeId;

/// Gather the rows of `content` listed in `ids`, in listed order.
///
/// # Errors
///
/// Returns [`BatchError::Inconsistent`] if an id is out of range.
pub fn gather_level(ids: &[NodeId], content: ArrayView2<'_, f32>) -> Result<Array2<f32>, BatchError> {
    let n_rows = content.nrows();
    let mut out = Array2::<f32>::zeros((ids.len(), content.ncols()));
    for (mut row, &id) in out.rows_mut().into_iter().zip(ids) {
        if id as usize >= n_rows {
            return Err(BatchError::Inconsistent(format!(
                "gather of node {id} from {n_rows} rows"
            )));
        }
        row.assign(&content.row(id as usize));
    }
    Ok(out)
}

/// Gather one content array per level.
pub fn gather_levels(
    levels: &[Vec<NodeId>],
    content: ArrayView2<'_, f32>,
) -> Result<Vec<Array2<f32>>, BatchError> {
    levels.iter().map(|ids| gather_level(ids, content)).collect()
}

/// Inverse of [`gather_levels`]: write per-level rows back to global id order.
///
/// `per_level[d]` must have one row per id in `levels[d]`; all arrays must
/// share a width. Rows of nodes missing from `levels` stay zero.
///
/// # Errors
///
/// Returns [`BatchError::Inconsistent`] on row-count or width mismatches, or
/// on an id outside `0..n_nodes`.
pub fn scatter_levels(
    levels: &[Vec<NodeId>],
    per_level: &[ArrayView2<'_, f32>],
    n_nodes: usize,
) -> Result<Array2<f32>, BatchError> {
    if levels.len() != per_level.len() {
        return Err(BatchError::Inconsistent(format!(
            "{} levels but {} arrays to scatter",
            levels.len(),
            per_level.len()
        )));
    }
    let width = per_level.first().map_or(0, |a| a.ncols());
    let mut out = Array2::<f32>::zeros((n_nodes, width));

    for (depth, (ids, values)) in levels.iter().zip(per_level).enumerate() {
        if values.nrows() != ids.len() || values.ncols() != width {
            return Err(BatchError::Inconsistent(format!(
                "level {depth} has {} ids but a {:?} array",
                ids.len(),
                values.shape()
            )));
        }
        for (&id, row) in ids.iter().zip(values.rows()) {
            if id as usize >= n_nodes {
                return Err(BatchError::Inconsistent(format!(
                    "scatter of node {id} into {n_nodes} rows"
                )));
            }
            out.row_mut(id as usize).assign(&row);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gather_follows_id_order() {
        let content = array![[0.0, 0.1], [1.0, 1.1], [2.0, 2.1]];
        let out = gather_level(&[2, 0], content.view()).unwrap();
        assert_eq!(out, array![[2.0, 2.1], [0.0, 0.1]]);
    }

    #[test]
    fn gather_out_of_range_is_inconsistent() {
        let content = array![[0.0], [1.0]];
        assert!(matches!(
            gather_level(&[0, 5], content.view()),
            Err(BatchError::Inconsistent(_))
        ));
    }

    #[test]
    fn scatter_inverts_gather() {
        let content = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let levels = vec![vec![3], vec![1, 4, 0], vec![2]];
        let gathered = gather_levels(&levels, content.view()).unwrap();
        let views: Vec<_> = gathered.iter().map(|a| a.view()).collect();
        let back = scatter_levels(&levels, &views, 5).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn scatter_rejects_row_mismatch() {
        let levels = vec![vec![0, 1]];
        let values = array![[1.0]];
        assert!(scatter_levels(&levels, &[values.view()], 2).is_err());
    }
}
