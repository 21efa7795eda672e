//! Turn a list of samples into one model-ready mini-batch.

use ndarray::Array1;
use rand::Rng;

use super::jet::Sample;
use super::leaves::{batch_leaves, LeafOptions, PaddedLeaves};
use crate::config::{BatchMode, LoaderConfig};
use crate::error::BatchError;
use crate::layout::{batch_trees, TreeBatch};
use crate::repr::Tree;

/// Model inputs of one mini-batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInputs {
    Trees(TreeBatch),
    Leaves(PaddedLeaves),
}

impl BatchInputs {
    pub fn as_trees(&self) -> Option<&TreeBatch> {
        match self {
            Self::Trees(t) => Some(t),
            Self::Leaves(_) => None,
        }
    }

    pub fn as_leaves(&self) -> Option<&PaddedLeaves> {
        match self {
            Self::Trees(_) => None,
            Self::Leaves(l) => Some(l),
        }
    }
}

/// A collated mini-batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: BatchInputs,
    /// Integer labels as floats, one per sample.
    pub targets: Array1<f32>,
    /// Per-sample weights, present only when weighting is enabled.
    pub weights: Option<Array1<f32>>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Collate samples according to `config`.
///
/// In tree mode the jets' trees go through the layout engine; in leaves mode
/// their constituents are permuted, thinned and padded using `rng`.
///
/// # Errors
///
/// Propagates [`BatchError`] from the layout engine or padding. The batch is
/// never silently shrunk.
pub fn collate<R: Rng + ?Sized>(
    samples: &[&Sample],
    config: &LoaderConfig,
    rng: &mut R,
) -> Result<Batch, BatchError> {
    if samples.is_empty() {
        return Err(BatchError::EmptyBatch);
    }

    let inputs = match config.mode {
        BatchMode::Trees => {
            let trees: Vec<&Tree> = samples.iter().map(|s| &s.jet.tree).collect();
            BatchInputs::Trees(batch_trees(&trees)?)
        }
        BatchMode::Leaves => {
            let options = LeafOptions {
                permute: config.permute_particles,
                dropout: config.dropout,
            };
            let particles = samples.iter().map(|s| s.jet.constituents.view());
            BatchInputs::Leaves(batch_leaves(particles, options, rng)?)
        }
    };

    let targets: Array1<f32> = samples.iter().map(|s| s.label as f32).collect();
    let weights = config
        .weight_batches
        .then(|| samples.iter().map(|s| s.weight).collect::<Array1<f32>>());

    Ok(Batch {
        inputs,
        targets,
        weights,
    })
}
