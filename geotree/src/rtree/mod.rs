//! In-memory R-tree family over n-dimensional bounding boxes.
//!
//! One tree skeleton serves every variant:
//! - the basic Guttman R-tree with linear or quadratic splits
//! - the R*-tree with overlap-aware descent and forced reinsertion
//! - the Hilbert R-tree, which keeps node contents in Hilbert order
//!
//! Nodes live in an arena and refer to each other by slot; the variant
//! plugs in through an [`InsertionStrategy`](strategy::InsertionStrategy).

pub mod rtree_config;
pub mod rtree_constants;
pub mod rtree_types;
pub mod strategy;

mod integrity;
mod node_ref;
pub(crate) mod node_store;
mod rtree_impl;
pub(crate) mod tree_core;

pub use integrity::IntegrityReport;
pub use node_ref::{NodeRef, TreeReadGuard};
pub use rtree_config::{RTreeConfig, SplitAlgorithm, TreeVariant};
pub use rtree_types::{EntryId, IndexError, IndexResult, LeafEntry, NodeId, RTreeStats};
pub use rtree_impl::RTree;
