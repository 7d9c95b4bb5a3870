//! The tree skeleton shared by every variant.
//!
//! `TreeCore` owns the node arena and performs every structural change:
//! descent, overflow handling (forced reinsertion or split), root growth,
//! condensation after deletion and root collapse. Variant behavior is
//! injected through an [`InsertionStrategy`] and a [`NodeFactory`].
//!
//! The core is not synchronized; the [`RTree`](crate::RTree) handle wraps it
//! in a lock.

use std::cmp::Reverse;
use std::ops::ControlFlow;

use log::{debug, trace};

use crate::boundary::Envelope;

use super::node_store::{NodeFactory, NodeStore};
use super::rtree_types::{
    EntryId, IndexError, IndexResult, LeafEntry, NodeAux, NodeContent, NodeId, RTreeStats,
};
use super::strategy::{ChildSummary, ChooseContext, InsertionStrategy, SplitCandidate};

/// Something that can be attached to a node: an entry (to a leaf) or a
/// subtree (to a branch one level above it).
#[derive(Debug)]
enum Item {
    Entry(LeafEntry),
    Child(NodeId),
}

#[derive(Debug)]
pub(crate) struct TreeCore {
    pub(crate) nodes: NodeStore,
    pub(crate) root: NodeId,
    pub(crate) dimension: usize,
    pub(crate) min_entries: usize,
    pub(crate) max_entries: usize,
    pub(crate) factory: NodeFactory,
    strategy: Box<dyn InsertionStrategy>,
    pub(crate) entry_count: u64,
}

impl TreeCore {
    pub(crate) fn new(
        dimension: usize,
        min_entries: usize,
        max_entries: usize,
        factory: NodeFactory,
        strategy: Box<dyn InsertionStrategy>,
    ) -> Self {
        let mut nodes = NodeStore::new();
        let root = nodes.allocate(factory.leaf(dimension));
        TreeCore {
            nodes,
            root,
            dimension,
            min_entries,
            max_entries,
            factory,
            strategy,
            entry_count: 0,
        }
    }

    /// Number of levels, 1 for a lone leaf root.
    pub(crate) fn height(&self) -> u32 {
        self.nodes[self.root].level + 1
    }

    pub(crate) fn len(&self) -> u64 {
        self.entry_count
    }

    pub(crate) fn root_envelope(&self) -> &Envelope {
        &self.nodes[self.root].envelope
    }

    pub(crate) fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    pub(crate) fn insert(&mut self, envelope: Envelope, id: EntryId) -> IndexResult<()> {
        let entry = self.factory.entry(envelope, id);
        let mut reinserted = Vec::new();
        self.insert_item(Item::Entry(entry), 0, &mut reinserted)?;
        self.entry_count += 1;
        Ok(())
    }

    /// Places `item` in a node at `level` and restores the invariants along
    /// its path. `reinserted` records the levels that already went through
    /// forced reinsertion during the current top-level operation.
    fn insert_item(&mut self, item: Item, level: u32, reinserted: &mut Vec<u32>) -> IndexResult<()> {
        let (envelope, rank) = self.item_key(&item);
        let target = self.choose_node(&envelope, rank, level)?;
        self.attach(target, item)?;
        self.settle(target, reinserted)
    }

    fn item_key(&self, item: &Item) -> (Envelope, u64) {
        match item {
            Item::Entry(entry) => (entry.envelope.clone(), entry.rank),
            Item::Child(child) => {
                let node = &self.nodes[*child];
                (node.envelope.clone(), node.rank_range().1)
            }
        }
    }

    fn choose_node(&self, envelope: &Envelope, rank: u64, level: u32) -> IndexResult<NodeId> {
        let mut node_id = self.root;
        loop {
            let node = &self.nodes[node_id];
            if node.level == level {
                return Ok(node_id);
            }
            if node.level < level {
                return Err(IndexError::Corrupted(format!(
                    "no node at level {} below node {} (level {})",
                    level, node_id, node.level
                )));
            }

            if node.is_empty() {
                return Err(IndexError::Corrupted(format!(
                    "branch node {} has no children",
                    node_id
                )));
            }
            let children = node.children();
            let summaries: Vec<ChildSummary<'_>> = children
                .iter()
                .map(|&c| {
                    let child = &self.nodes[c];
                    let (low_rank, high_rank) = child.rank_range();
                    ChildSummary {
                        envelope: &child.envelope,
                        low_rank,
                        high_rank,
                    }
                })
                .collect();
            let index = self.strategy.choose_subtree(&ChooseContext {
                envelope,
                rank,
                level: node.level,
                children: &summaries,
            });
            node_id = children[index.min(children.len() - 1)];
        }
    }

    /// Adds `item` to the contents of `node_id`, keeping Hilbert order.
    fn attach(&mut self, node_id: NodeId, item: Item) -> IndexResult<()> {
        let ordered = self.factory.is_ordered();
        match item {
            Item::Entry(entry) => match &mut self.nodes[node_id].content {
                NodeContent::Leaf(entries) => {
                    let pos = if ordered {
                        entries.partition_point(|e| e.rank <= entry.rank)
                    } else {
                        entries.len()
                    };
                    entries.insert(pos, entry);
                    Ok(())
                }
                NodeContent::Branch(_) => Err(IndexError::Corrupted(format!(
                    "entry {} routed to branch node {}",
                    entry.id, node_id
                ))),
            },
            Item::Child(child) => {
                let child_high = self.nodes[child].rank_range().1;
                let pos = match &self.nodes[node_id].content {
                    NodeContent::Branch(children) if ordered => children
                        .partition_point(|&c| self.nodes[c].rank_range().1 <= child_high),
                    NodeContent::Branch(children) => children.len(),
                    NodeContent::Leaf(_) => {
                        return Err(IndexError::Corrupted(format!(
                            "subtree {} routed to leaf node {}",
                            child, node_id
                        )))
                    }
                };
                if let NodeContent::Branch(children) = &mut self.nodes[node_id].content {
                    children.insert(pos, child);
                }
                self.nodes[child].parent = Some(node_id);
                Ok(())
            }
        }
    }

    /// Walks from `node_id` to the root, resolving overflow and refreshing
    /// envelopes on the way.
    fn settle(&mut self, mut node_id: NodeId, reinserted: &mut Vec<u32>) -> IndexResult<()> {
        loop {
            if self.nodes[node_id].len() > self.max_entries {
                let level = self.nodes[node_id].level;
                if node_id != self.root && !reinserted.contains(&level) {
                    reinserted.push(level);
                    if let Some(selection) = self.reinsert_selection(node_id) {
                        return self.force_reinsert(node_id, selection, reinserted);
                    }
                }
                node_id = self.split(node_id)?;
            } else {
                self.refresh(node_id);
                match self.nodes[node_id].parent {
                    Some(parent) => node_id = parent,
                    None => return Ok(()),
                }
            }
        }
    }

    /// Envelope and rank of every item of a node, in content order.
    fn content_keys(&self, node_id: NodeId) -> Vec<(Envelope, u64)> {
        match &self.nodes[node_id].content {
            NodeContent::Leaf(entries) => entries
                .iter()
                .map(|e| (e.envelope.clone(), e.rank))
                .collect(),
            NodeContent::Branch(children) => children
                .iter()
                .map(|&c| {
                    let child = &self.nodes[c];
                    (child.envelope.clone(), child.rank_range().1)
                })
                .collect(),
        }
    }

    fn reinsert_selection(&self, node_id: NodeId) -> Option<Vec<usize>> {
        let keys = self.content_keys(node_id);
        let node_envelope = keys
            .iter()
            .fold(Envelope::empty(self.dimension), |acc, (e, _)| acc.union(e));
        let candidates: Vec<SplitCandidate<'_>> = keys
            .iter()
            .map(|(envelope, rank)| SplitCandidate {
                envelope,
                rank: *rank,
            })
            .collect();
        self.strategy
            .reinsert_selection(&node_envelope, &candidates, self.min_entries)
            .filter(|selection| !selection.is_empty())
    }

    /// Removes the selected items of an overflowing node and inserts them
    /// again from the root, at the node's level.
    fn force_reinsert(
        &mut self,
        node_id: NodeId,
        selection: Vec<usize>,
        reinserted: &mut Vec<u32>,
    ) -> IndexResult<()> {
        let level = self.nodes[node_id].level;
        let items = self.extract(node_id, &selection);
        trace!(
            "{}: reinserting {} items of node {} at level {}",
            self.strategy.name(),
            items.len(),
            node_id,
            level
        );
        self.refresh_upward(node_id);
        for item in items {
            self.insert_item(item, level, reinserted)?;
        }
        Ok(())
    }

    /// Takes the items at `indices` out of a node, in the order given.
    fn extract(&mut self, node_id: NodeId, indices: &[usize]) -> Vec<Item> {
        match &mut self.nodes[node_id].content {
            NodeContent::Leaf(entries) => {
                let (taken, kept) = take_indices(std::mem::take(entries), indices);
                *entries = kept;
                taken.into_iter().map(Item::Entry).collect()
            }
            NodeContent::Branch(children) => {
                let (taken, kept) = take_indices(std::mem::take(children), indices);
                *children = kept;
                taken.into_iter().map(Item::Child).collect()
            }
        }
    }

    /// Splits an overflowing node and returns the node to continue settling
    /// from: the parent, or the new root.
    fn split(&mut self, node_id: NodeId) -> IndexResult<NodeId> {
        let keys = self.content_keys(node_id);
        let candidates: Vec<SplitCandidate<'_>> = keys
            .iter()
            .map(|(envelope, rank)| SplitCandidate {
                envelope,
                rank: *rank,
            })
            .collect();
        let partition = self.strategy.split(&candidates, self.min_entries);
        if !is_partition_of(&partition.left, &partition.right, keys.len()) {
            return Err(IndexError::Corrupted(format!(
                "{} split of node {} returned {} + {} of {} items",
                self.strategy.name(),
                node_id,
                partition.left.len(),
                partition.right.len(),
                keys.len()
            )));
        }

        let level = self.nodes[node_id].level;
        let parent = self.nodes[node_id].parent;
        let items = self.extract(node_id, &partition.right);

        let mut sibling = if level == 0 {
            let mut entries: Vec<LeafEntry> = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Entry(e) => Some(e),
                    Item::Child(_) => None,
                })
                .collect();
            if self.factory.is_ordered() {
                entries.sort_by_key(|e| e.rank);
            }
            let mut node = self.factory.leaf(self.dimension);
            node.content = NodeContent::Leaf(entries);
            node
        } else {
            let children: Vec<NodeId> = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Child(c) => Some(c),
                    Item::Entry(_) => None,
                })
                .collect();
            let mut node = self.factory.branch(self.dimension, level);
            node.content = NodeContent::Branch(children);
            node
        };
        sibling.parent = parent;
        let sibling_id = self.nodes.allocate(sibling);
        for child in self.nodes[sibling_id].children().to_vec() {
            self.nodes[child].parent = Some(sibling_id);
        }
        self.refresh(node_id);
        self.refresh(sibling_id);

        trace!(
            "{}: split node {} at level {} into {} + {}",
            self.strategy.name(),
            node_id,
            level,
            self.nodes[node_id].len(),
            self.nodes[sibling_id].len()
        );

        match parent {
            Some(parent) => {
                self.attach(parent, Item::Child(sibling_id))?;
                Ok(parent)
            }
            None => {
                let mut root = self.factory.branch(self.dimension, level + 1);
                root.content = NodeContent::Branch(vec![node_id, sibling_id]);
                let root_id = self.nodes.allocate(root);
                self.nodes[node_id].parent = Some(root_id);
                self.nodes[sibling_id].parent = Some(root_id);
                self.root = root_id;
                debug!("root split, tree height is now {}", self.height());
                Ok(root_id)
            }
        }
    }

    /// Recomputes the exact envelope and rank interval of a node from its
    /// contents. Branch children of ordered variants are re-sorted by their
    /// highest rank first.
    fn refresh(&mut self, node_id: NodeId) {
        if self.factory.is_ordered() {
            let mut children = self.nodes[node_id].children().to_vec();
            if children.len() > 1 {
                children.sort_by_key(|&c| {
                    let (low, high) = self.nodes[c].rank_range();
                    (high, low)
                });
                self.nodes[node_id].content = NodeContent::Branch(children);
            }
        }

        let mut envelope = Envelope::empty(self.dimension);
        let mut low = u64::MAX;
        let mut high = 0;
        match &self.nodes[node_id].content {
            NodeContent::Leaf(entries) => {
                for e in entries {
                    envelope.expand(&e.envelope);
                    low = low.min(e.rank);
                    high = high.max(e.rank);
                }
            }
            NodeContent::Branch(children) => {
                for &c in children {
                    let child = &self.nodes[c];
                    envelope.expand(&child.envelope);
                    let (child_low, child_high) = child.rank_range();
                    low = low.min(child_low);
                    high = high.max(child_high);
                }
            }
        }

        let node = &mut self.nodes[node_id];
        node.envelope = envelope;
        if let NodeAux::Hilbert {
            low: node_low,
            high: node_high,
        } = &mut node.aux
        {
            *node_low = low;
            *node_high = high;
        }
    }

    fn refresh_upward(&mut self, mut node_id: NodeId) {
        loop {
            self.refresh(node_id);
            match self.nodes[node_id].parent {
                Some(parent) => node_id = parent,
                None => return,
            }
        }
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    /// Removes the entry with this exact envelope and id. Returns false if
    /// no such entry exists.
    pub(crate) fn remove(&mut self, envelope: &Envelope, id: EntryId) -> IndexResult<bool> {
        let Some((leaf, pos)) = self.find_leaf(self.root, envelope, id) else {
            return Ok(false);
        };
        if let NodeContent::Leaf(entries) = &mut self.nodes[leaf].content {
            entries.remove(pos);
        }
        self.entry_count -= 1;
        self.condense(leaf)?;
        Ok(true)
    }

    /// Finds the leaf holding `(envelope, id)`, descending into every child
    /// whose envelope contains the target.
    fn find_leaf(&self, node_id: NodeId, envelope: &Envelope, id: EntryId) -> Option<(NodeId, usize)> {
        let node = &self.nodes[node_id];
        if !node.envelope.contains(envelope) {
            return None;
        }
        match &node.content {
            NodeContent::Leaf(entries) => entries
                .iter()
                .position(|e| e.id == id && e.envelope == *envelope)
                .map(|pos| (node_id, pos)),
            NodeContent::Branch(children) => children
                .iter()
                .find_map(|&child| self.find_leaf(child, envelope, id)),
        }
    }

    /// Guttman's CondenseTree: underfull nodes on the path from `leaf` to the
    /// root are detached and freed, their contents reinserted at their
    /// original level. Then a single-child root is collapsed.
    fn condense(&mut self, leaf: NodeId) -> IndexResult<()> {
        let mut orphans: Vec<(Item, u32)> = Vec::new();
        let mut node_id = leaf;

        while let Some(parent) = self.nodes[node_id].parent {
            if self.nodes[node_id].len() < self.min_entries {
                if let NodeContent::Branch(children) = &mut self.nodes[parent].content {
                    children.retain(|&c| c != node_id);
                }
                if let Some(node) = self.nodes.free(node_id) {
                    let level = node.level;
                    match node.content {
                        NodeContent::Leaf(entries) => {
                            orphans.extend(entries.into_iter().map(|e| (Item::Entry(e), level)))
                        }
                        NodeContent::Branch(children) => {
                            orphans.extend(children.into_iter().map(|c| (Item::Child(c), level)))
                        }
                    }
                }
            } else {
                self.refresh(node_id);
            }
            node_id = parent;
        }
        self.refresh(node_id);

        if !orphans.is_empty() {
            trace!("condense: reinserting {} orphaned items", orphans.len());
        }
        // Subtrees first, so they find branches at their level before the
        // entries below them are reinserted.
        orphans.sort_by_key(|(_, level)| Reverse(*level));
        for (item, level) in orphans {
            let mut reinserted = Vec::new();
            self.insert_item(item, level, &mut reinserted)?;
        }

        self.shorten_root();
        Ok(())
    }

    /// Replaces a branch root that has a single child by that child.
    fn shorten_root(&mut self) {
        loop {
            let root = &self.nodes[self.root];
            if root.is_leaf() || root.len() > 1 {
                return;
            }
            let only = root.children().first().copied();
            self.nodes.free(self.root);
            match only {
                Some(child) => {
                    self.nodes[child].parent = None;
                    self.root = child;
                    debug!("root collapsed, tree height is now {}", self.height());
                }
                None => {
                    self.root = self.nodes.allocate(self.factory.leaf(self.dimension));
                    debug!("root emptied, tree reset to a single leaf");
                    return;
                }
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.allocate(self.factory.leaf(self.dimension));
        self.entry_count = 0;
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Visits every entry intersecting `query`, descending only into nodes
    /// that intersect it. Stops as soon as `visit` breaks.
    pub(crate) fn search<F>(&self, query: &Envelope, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&LeafEntry) -> ControlFlow<()>,
    {
        self.search_node(self.root, query, visit)
    }

    fn search_node<F>(&self, node_id: NodeId, query: &Envelope, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&LeafEntry) -> ControlFlow<()>,
    {
        let node = &self.nodes[node_id];
        if !node.envelope.intersects(query) {
            return ControlFlow::Continue(());
        }
        match &node.content {
            NodeContent::Leaf(entries) => {
                for entry in entries {
                    if entry.envelope.intersects(query) {
                        visit(entry)?;
                    }
                }
            }
            NodeContent::Branch(children) => {
                for &child in children {
                    self.search_node(child, query, visit)?;
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Calls `visit` on every entry of the tree.
    pub(crate) fn for_each_entry<F>(&self, visit: &mut F)
    where
        F: FnMut(&LeafEntry),
    {
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            match &self.nodes[node_id].content {
                NodeContent::Leaf(entries) => entries.iter().for_each(&mut *visit),
                NodeContent::Branch(children) => stack.extend(children.iter().rev()),
            }
        }
    }

    /// The `k` entries nearest to `point`, nearest first, as `(id, distance)`
    /// pairs. Distance is measured to the entry envelope (zero inside).
    pub(crate) fn find_nearest(
        &self,
        point: &[f64],
        k: usize,
        max_distance: Option<f64>,
    ) -> Vec<(EntryId, f64)> {
        if k == 0 || self.entry_count == 0 {
            return Vec::new();
        }
        let mut results: Vec<(EntryId, f64)> = Vec::new();
        let mut bound = max_distance.unwrap_or(f64::INFINITY);
        self.find_nearest_node(self.root, point, k, &mut results, &mut bound);
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        results.truncate(k);
        results
    }

    fn find_nearest_node(
        &self,
        node_id: NodeId,
        point: &[f64],
        k: usize,
        results: &mut Vec<(EntryId, f64)>,
        bound: &mut f64,
    ) {
        match &self.nodes[node_id].content {
            NodeContent::Leaf(entries) => {
                for entry in entries {
                    let distance = entry.envelope.min_distance(point);
                    if distance <= *bound {
                        results.push((entry.id, distance));
                        if results.len() > k {
                            results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                            results.truncate(k);
                            if let Some((_, kth)) = results.last() {
                                *bound = *kth;
                            }
                        }
                    }
                }
            }
            NodeContent::Branch(children) => {
                let mut candidates: Vec<(NodeId, f64)> = children
                    .iter()
                    .map(|&c| (c, self.nodes[c].envelope.min_distance(point)))
                    .collect();
                // Nearest subtrees first tighten the bound early.
                candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
                for (child, distance) in candidates {
                    if distance > *bound {
                        continue;
                    }
                    self.find_nearest_node(child, point, k, results, bound);
                }
            }
        }
    }

    pub(crate) fn stats(&self) -> RTreeStats {
        let mut leaf_count = 0;
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            if node.is_leaf() {
                leaf_count += 1;
            }
            stack.extend_from_slice(node.children());
        }
        RTreeStats {
            total_entries: self.entry_count,
            tree_height: self.height(),
            node_count: self.nodes.live() as u64,
            leaf_count,
            free_slots: self.nodes.free_slots() as u64,
        }
    }
}

/// True if `left` and `right` are non-empty and together hold every index
/// of `0..n` exactly once.
fn is_partition_of(left: &[usize], right: &[usize], n: usize) -> bool {
    if left.is_empty() || right.is_empty() || left.len() + right.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &i in left.iter().chain(right) {
        if i >= n || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}

/// Splits `items` into the elements at `indices` (in that order) and the
/// rest (in original order).
fn take_indices<T>(items: Vec<T>, indices: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let taken = indices.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect();
    let kept = slots.into_iter().flatten().collect();
    (taken, kept)
}
