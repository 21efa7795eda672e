//! Data-loading path around the layout engine.
//!
//! - [`Jet`], [`Sample`]: a clustering tree with its constituents, label and weight
//! - [`collate`]: samples to a model-ready [`Batch`] (tree layout or padded leaves)
//! - [`JetLoader`]: epoch iteration, parallel collection and prefetching

mod collate;
mod jet;
mod leaves;
mod loader;
mod prefetch;

pub use collate::{collate, Batch, BatchInputs};
pub use jet::{Jet, Sample};
pub use leaves::{
    batch_leaves, drop_particles, pad_with_extra_channel, permute_particles, LeafOptions,
    PaddedLeaves,
};
pub use loader::{EpochIter, JetLoader};
pub use prefetch::Prefetcher;
