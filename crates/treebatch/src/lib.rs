//! treebatch: level-synchronized batching of binary trees.
//!
//! Packs a batch of independent full binary trees (jet clustering trees,
//! parse trees) into per-depth node lists so that a bottom-up recursive
//! network can process one whole depth of the batch at a time.
//!
//! # Key Types
//!
//! - [`Tree`] / [`TreeView`] - Input trees (child table, root id, node content)
//! - [`TreeBatch`] - The published layout: levels, internal counts, child
//!   addresses and per-level content
//! - [`JetLoader`] / [`LoaderConfig`] - Mini-batch loading over a jet dataset
//!
//! # Batching
//!
//! Use [`batch_trees`] for a single batch, or a [`TreeBatcher`] to lay out
//! many batches across threads. See the [`layout`] module for the format.
//!
//! # Loading Jets
//!
//! Read records with [`io::read_jets_json`], then wrap them in a
//! [`JetLoader`] to iterate shuffled, collated mini-batches.

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod layout;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Tree representation
pub use repr::{NodeId, Tree, TreeView, NO_CHILD};

// Layout engine
pub use layout::{batch_trees, ChildAddress, ChildAddressTable, TreeBatch, TreeBatcher};

// Errors
pub use error::{BatchError, MalformedTreeError};

// Loading
pub use config::{BatchMode, LoaderConfig, Verbosity};
pub use data::{Batch, BatchInputs, Jet, JetLoader, Sample};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
