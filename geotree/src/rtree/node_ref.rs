//! Read-only views of tree nodes.

use std::sync::Arc;

use parking_lot::RwLockReadGuard;

use crate::boundary::{Boundary, Envelope};
use crate::coordinate_system::CoordinateSystem;

use super::rtree_types::{EntryId, NodeId};
use super::tree_core::TreeCore;

/// Shared access to a tree. Writers block while a guard is alive.
pub struct TreeReadGuard<'a> {
    core: RwLockReadGuard<'a, TreeCore>,
    crs: &'a Arc<CoordinateSystem>,
}

impl<'a> TreeReadGuard<'a> {
    pub(crate) fn new(core: RwLockReadGuard<'a, TreeCore>, crs: &'a Arc<CoordinateSystem>) -> Self {
        TreeReadGuard { core, crs }
    }

    /// The root node. An empty tree has an empty leaf root.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            core: &self.core,
            crs: self.crs,
            id: self.core.root,
        }
    }

    /// Number of indexed entries.
    pub fn len(&self) -> u64 {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.len() == 0
    }

    /// Number of levels.
    pub fn height(&self) -> u32 {
        self.core.height()
    }
}

/// A node seen through a [`TreeReadGuard`].
///
/// Exposes the contract every variant shares: leaf flag, boundary,
/// entries or children, and the parent.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    core: &'a TreeCore,
    crs: &'a Arc<CoordinateSystem>,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// Arena slot of the node; stable while the guard is held.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_leaf(&self) -> bool {
        self.core.nodes[self.id].is_leaf()
    }

    /// Height above the leaves.
    pub fn level(&self) -> u32 {
        self.core.nodes[self.id].level
    }

    /// Union of the node's contents.
    pub fn envelope(&self) -> &'a Envelope {
        &self.core.nodes[self.id].envelope
    }

    pub fn boundary(&self) -> Boundary {
        Boundary::from_trusted(self.crs.clone(), self.envelope().clone())
    }

    /// Number of entries (leaf) or children (branch).
    pub fn len(&self) -> usize {
        self.core.nodes[self.id].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of a leaf; empty for branches.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &'a Envelope)> + 'a {
        self.core.nodes[self.id]
            .entries()
            .iter()
            .map(|e| (e.id, &e.envelope))
    }

    /// Children of a branch; empty for leaves.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let core = self.core;
        let crs = self.crs;
        core.nodes[self.id]
            .children()
            .iter()
            .map(move |&id| NodeRef { core, crs, id })
    }

    /// The owning branch, `None` for the root.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.core.nodes[self.id].parent.map(|id| NodeRef {
            core: self.core,
            crs: self.crs,
            id,
        })
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("level", &self.level())
            .field("len", &self.len())
            .field("envelope", self.envelope())
            .finish()
    }
}
