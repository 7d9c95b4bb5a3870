//! # geotree - R-tree family for n-dimensional bounding boxes
//!
//! This crate provides in-memory spatial indexing of axis-aligned boxes in
//! any number of dimensions, with topological queries on top of a
//! visitor-driven range search.
//!
//! ## Features
//!
//! - **Three tree variants**: basic R-tree (linear or quadratic split),
//!   R*-tree (forced reinsertion, margin-driven split) and Hilbert R-tree
//! - **N dimensions**: 2-D, 3-D and compound spatial + temporal coordinate
//!   systems
//! - **Topological predicates**: intersects, contains, within, disjoint,
//!   touches, equals and overlaps, evaluated on bounding boxes
//! - **Nearest neighbors**: branch-and-bound k-NN with a distance bound
//! - **Thread safe**: one writer at a time, concurrent readers
//! - **Object indexing**: an [`ElementMapper`] maps application objects to
//!   compact tree identifiers
//!
//! ## Quick Start
//!
//! ```rust
//! use geotree::{Boundary, CoordinateSystem, RTree, RTreeConfig, SpatialPredicate, SpatialTree, TreeVariant};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let crs = CoordinateSystem::cartesian(3).shared();
//! let tree = RTree::new(crs.clone(), RTreeConfig::new(TreeVariant::Star))?;
//!
//! tree.insert(&Boundary::new(crs.clone(), [(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)])?, 1)?;
//! tree.insert(&Boundary::new(crs.clone(), [(4.0, 5.0), (4.0, 5.0), (4.0, 5.0)])?, 2)?;
//!
//! let query = Boundary::new(crs, [(-1.0, 2.0), (-1.0, 2.0), (-1.0, 2.0)])?;
//! assert_eq!(tree.find(SpatialPredicate::Within, &query)?, vec![1]);
//! assert_eq!(tree.find(SpatialPredicate::Disjoint, &query)?, vec![2]);
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod coordinate_system;
pub mod element_mapper;
pub mod hilbert;
pub mod predicate;
pub mod rtree;
pub mod search;
pub mod spatial_index;
pub mod spatial_tree;

pub use boundary::{Boundary, Envelope};
pub use coordinate_system::{Axis, AxisKind, CoordinateSystem};
pub use element_mapper::{ElementMapper, HashElementMapper};
pub use predicate::SpatialPredicate;
pub use rtree::strategy;
pub use rtree::{
    EntryId, IndexError, IndexResult, IntegrityReport, LeafEntry, NodeId, NodeRef, RTree,
    RTreeConfig, RTreeStats, SplitAlgorithm, TreeReadGuard, TreeVariant,
};
pub use search::{CollectVisitor, SearchOutcome, SearchVisitor};
pub use spatial_index::SpatialIndex;
pub use spatial_tree::SpatialTree;
