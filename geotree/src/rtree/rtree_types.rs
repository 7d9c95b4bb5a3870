//! Core types and data structures for the R-tree family.
//!
//! This module defines the fundamental types used throughout the tree:
//! - Error types and result types
//! - Node types (Leaf and Branch) and leaf entries
//! - Statistics structures

use thiserror::Error;

use crate::boundary::Envelope;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected} axes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Coordinate system mismatch: expected {expected}, got {actual}")]
    CoordinateSystemMismatch { expected: String, actual: String },

    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Index corrupted: {0}")]
    Corrupted(String),
}

/// Result type for spatial operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Opaque identifier of an indexed element. Resolved to an application
/// object only through an [`ElementMapper`](crate::ElementMapper).
pub type EntryId = u64;

/// Slot of a node in the node arena
pub type NodeId = usize;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the tree shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub total_entries: u64,
    /// Number of levels; 1 for a tree whose root is a leaf
    pub tree_height: u32,
    pub node_count: u64,
    pub leaf_count: u64,
    /// Arena slots released by deletions and waiting for reuse
    pub free_slots: u64,
}

// ============================================================================
// Node Types
// ============================================================================

/// An entry in a leaf node
#[derive(Debug, Clone, PartialEq)]
pub struct LeafEntry {
    pub envelope: Envelope,
    pub id: EntryId,
    /// Hilbert rank of the envelope center; zero for unordered variants
    pub(crate) rank: u64,
}

impl LeafEntry {
    /// Creates an entry without a Hilbert rank.
    pub fn new(envelope: Envelope, id: EntryId) -> Self {
        LeafEntry {
            envelope,
            id,
            rank: 0,
        }
    }
}

/// Contents of a node
#[derive(Debug, Clone)]
pub(crate) enum NodeContent {
    /// Leaf node containing actual entries
    Leaf(Vec<LeafEntry>),
    /// Branch node containing the ids of its child nodes
    Branch(Vec<NodeId>),
}

/// Variant-private node state. Never exposed through [`NodeRef`](crate::NodeRef).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeAux {
    Plain,
    /// Smallest and largest Hilbert rank found below this node
    Hilbert { low: u64, high: u64 },
}

/// A tree node.
///
/// A parent owns its children: a branch holds the arena ids of its children
/// and is the only node that does. `parent` is a non-owning back link used
/// to propagate envelope changes towards the root.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Exact union of the contents; empty for an empty leaf
    pub(crate) envelope: Envelope,
    pub(crate) parent: Option<NodeId>,
    /// Height above the leaves (leaves are 0)
    pub(crate) level: u32,
    pub(crate) content: NodeContent,
    pub(crate) aux: NodeAux,
}

impl Node {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.content, NodeContent::Leaf(_))
    }

    pub(crate) fn len(&self) -> usize {
        match &self.content {
            NodeContent::Leaf(entries) => entries.len(),
            NodeContent::Branch(children) => children.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `(low, high)` Hilbert rank interval, `(0, 0)` for plain nodes.
    pub(crate) fn rank_range(&self) -> (u64, u64) {
        match self.aux {
            NodeAux::Plain => (0, 0),
            NodeAux::Hilbert { low, high } => (low, high),
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.content {
            NodeContent::Branch(children) => children,
            NodeContent::Leaf(_) => &[],
        }
    }

    pub(crate) fn entries(&self) -> &[LeafEntry] {
        match &self.content {
            NodeContent::Leaf(entries) => entries,
            NodeContent::Branch(_) => &[],
        }
    }
}
