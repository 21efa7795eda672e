//! Test and benchmark helpers.
//!
//! Seeded generators for random trees and jets, and two folds over trees:
//! a plain recursive one used as an oracle and a level-synchronized one
//! driven by a [`TreeBatch`](crate::TreeBatch).

mod data;
mod fold;

pub use data::{random_batch, random_content, random_samples, random_tree};
pub use fold::{level_fold, recursive_fold};
