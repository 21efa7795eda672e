//! Arena representation of input trees.
//!
//! Trees are stored as flat arrays addressed by integer node id. Child
//! relationships are an `[n_nodes, 2]` table of ids with [`NO_CHILD`] marking
//! terminal nodes, and node features are an `[n_nodes, n_features]` matrix.

/// Node identifier within a tree, or within a batch after reindexing.
pub type NodeId = u32;

/// Sentinel child id for terminal nodes.
pub const NO_CHILD: i64 = -1;

pub mod tree;

pub use tree::{Tree, TreeView};
