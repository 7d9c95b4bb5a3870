//! Node arena and variant-specific node construction.
//!
//! Nodes live in a slab indexed by [`NodeId`]. Freed slots are recycled
//! through a free list, so ids stay small and stable for the lifetime of a
//! node.

use std::ops::{Index, IndexMut};

use crate::boundary::Envelope;
use crate::hilbert::HilbertCurve;

use super::rtree_types::{EntryId, LeafEntry, Node, NodeAux, NodeContent, NodeId};

/// Slab of tree nodes with slot reuse.
#[derive(Debug, Default)]
pub(crate) struct NodeStore {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl NodeStore {
    pub(crate) fn new() -> Self {
        NodeStore::default()
    }

    /// Stores `node` and returns its id. Reuses a freed slot if one exists.
    pub(crate) fn allocate(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(node);
            return id;
        }
        self.slots.push(Some(node));
        self.slots.len() - 1
    }

    /// Releases the slot of `id` and returns the node it held.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id)?.take()?;
        self.free.push(id);
        Some(node)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of released slots waiting for reuse.
    pub(crate) fn free_slots(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl Index<NodeId> for NodeStore {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.slots.get(id) {
            Some(Some(node)) => node,
            _ => panic!("node {} is not allocated", id),
        }
    }
}

impl IndexMut<NodeId> for NodeStore {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id) {
            Some(Some(node)) => node,
            _ => panic!("node {} is not allocated", id),
        }
    }
}

/// Builds nodes and leaf entries carrying the auxiliary data of a variant.
#[derive(Debug, Clone)]
pub(crate) enum NodeFactory {
    /// No auxiliary data
    Plain,
    /// Nodes track a Hilbert rank interval, entries their own rank
    Hilbert(HilbertCurve),
}

impl NodeFactory {
    fn aux(&self) -> NodeAux {
        match self {
            NodeFactory::Plain => NodeAux::Plain,
            // Inverted interval, the identity of the rank range union.
            NodeFactory::Hilbert(_) => NodeAux::Hilbert {
                low: u64::MAX,
                high: 0,
            },
        }
    }

    /// An empty leaf.
    pub(crate) fn leaf(&self, dimension: usize) -> Node {
        Node {
            envelope: Envelope::empty(dimension),
            parent: None,
            level: 0,
            content: NodeContent::Leaf(Vec::new()),
            aux: self.aux(),
        }
    }

    /// An empty branch at `level`.
    pub(crate) fn branch(&self, dimension: usize, level: u32) -> Node {
        Node {
            envelope: Envelope::empty(dimension),
            parent: None,
            level,
            content: NodeContent::Branch(Vec::new()),
            aux: self.aux(),
        }
    }

    /// A leaf entry, ranked when the variant orders its contents.
    pub(crate) fn entry(&self, envelope: Envelope, id: EntryId) -> LeafEntry {
        let rank = match self {
            NodeFactory::Plain => 0,
            NodeFactory::Hilbert(curve) => curve.rank_of(&envelope),
        };
        LeafEntry { envelope, id, rank }
    }

    /// True if node contents are kept sorted by Hilbert rank.
    pub(crate) fn is_ordered(&self) -> bool {
        matches!(self, NodeFactory::Hilbert(_))
    }
}
