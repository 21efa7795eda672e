//! Level-synchronized tree batching.
//!
//! Turns a batch of independently shaped binary trees into a layout where a
//! recursive computation over all trees runs as one bulk operation per depth.
//!
//! # Pipeline
//!
//! ```text
//! trees ──► reindex ──► discover_levels ──► build_levels ──► gather_levels ──► TreeBatch
//!           global ids   depth, class,       per-depth        per-depth
//!                        raw child slots     sequences,       content
//!                                            final addresses
//! ```
//!
//! Stages run once per batch, strictly in order. A failure in any stage
//! aborts the batch.
//!
//! # Layout
//!
//! For two trees, a stump `A(a1, a2)` and `B(B1(b3, b4), b2)`:
//!
//! ```text
//! depth 0:  [A, B]             n_inner = 2
//! depth 1:  [B1, a1, a2, b2]   n_inner = 1
//! depth 2:  [b3, b4]           n_inner = 0
//!
//! A  -> (1, terminal), (2, terminal)
//! B  -> (0, internal), (3, terminal)
//! B1 -> (0, terminal), (1, terminal)
//! ```

mod batch;
mod builder;
mod gather;
mod levels;
mod reindex;

pub use batch::{batch_trees, TreeBatch, TreeBatcher};
pub use builder::{build_levels, ChildAddressTable, LevelLayout};
pub use gather::{gather_level, gather_levels, scatter_levels};
pub use levels::{discover_levels, ChildAddress, LevelDiscovery, LevelPartition};
pub use reindex::{reindex, MergedForest};
