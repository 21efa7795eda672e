//! JSON ingestion of jet datasets.
//!
//! Expects an array of records:
//!
//! ```json
//! [
//!   {
//!     "root_id": 0,
//!     "tree": [[1, 2], [-1, -1], [-1, -1]],
//!     "content": [[0.5, 1.0], [0.2, 0.3], [0.3, 0.7]],
//!     "constituents": [[0.2, 0.3], [0.3, 0.7]],
//!     "label": 1,
//!     "weight": 0.8
//!   }
//! ]
//! ```
//!
//! `constituents` defaults to the tree's terminal rows, `label` to 0 and
//! `weight` to 1.

use std::io::{Read, Write};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::{Jet, Sample};
use crate::error::MalformedTreeError;
use crate::repr::{NodeId, Tree, TreeView};

/// Errors that can occur when reading or writing a jet dataset.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {record}: {source}")]
    Malformed {
        record: usize,
        #[source]
        source: MalformedTreeError,
    },

    #[error("record {record}: ragged {field} rows")]
    Ragged { record: usize, field: &'static str },
}

/// One serialized jet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JetRecord {
    pub root_id: NodeId,
    pub tree: Vec<[i64; 2]>,
    pub content: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituents: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    pub label: u32,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl JetRecord {
    /// Convert to a validated sample.
    pub fn into_sample(self, record: usize) -> Result<Sample, IoError> {
        let content = rows_to_array(&self.content, record, "content")?;
        let tree = checked_tree(self.root_id, &self.tree, content)
            .map_err(|source| IoError::Malformed { record, source })?;

        let jet = match self.constituents {
            Some(rows) => {
                let mut particles = rows_to_array(&rows, record, "constituents")?;
                if rows.is_empty() {
                    particles = Array2::zeros((0, tree.n_features()));
                }
                Jet::new(tree, particles)
            }
            None => Jet::from_tree(tree),
        };
        Ok(Sample::new(jet, self.label, self.weight))
    }

    /// Serialize a sample.
    pub fn from_sample(sample: &Sample) -> Self {
        let tree = &sample.jet.tree;
        Self {
            root_id: tree.root(),
            tree: tree
                .child_table()
                .rows()
                .into_iter()
                .map(|r| [r[0], r[1]])
                .collect(),
            content: tree.content().rows().into_iter().map(|r| r.to_vec()).collect(),
            constituents: Some(
                sample
                    .jet
                    .constituents
                    .rows()
                    .into_iter()
                    .map(|r| r.to_vec())
                    .collect(),
            ),
            label: sample.label,
            weight: sample.weight,
        }
    }
}

/// Build a tree from pairs and a content matrix, then run [`Tree::validate`].
fn checked_tree(
    root: NodeId,
    pairs: &[[i64; 2]],
    content: Array2<f32>,
) -> Result<Tree, MalformedTreeError> {
    let flat: Vec<i64> = pairs.iter().flatten().copied().collect();
    let children = Array2::from_shape_vec((pairs.len(), 2), flat).map_err(|_| {
        MalformedTreeError::ShapeMismatch {
            children: [pairs.len(), 2],
            content_rows: content.nrows(),
        }
    })?;
    let tree = Tree::new(root, children, content)?;
    tree.validate()?;
    Ok(tree)
}

fn rows_to_array(rows: &[Vec<f32>], record: usize, field: &'static str) -> Result<Array2<f32>, IoError> {
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        return Err(IoError::Ragged { record, field });
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), width), flat).map_err(|_| IoError::Ragged { record, field })
}

/// Read and validate a JSON array of jet records.
pub fn read_jets_json<R: Read>(reader: R) -> Result<Vec<Sample>, IoError> {
    let records: Vec<JetRecord> = serde_json::from_reader(reader)?;
    let samples = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.into_sample(i))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(n_jets = samples.len(), "read jet dataset");
    Ok(samples)
}

/// Write samples as a JSON array of jet records.
pub fn write_jets_json<W: Write>(samples: &[Sample], writer: W) -> Result<(), IoError> {
    let records: Vec<JetRecord> = samples.iter().map(JetRecord::from_sample).collect();
    serde_json::to_writer(writer, &records)?;
    Ok(())
}
