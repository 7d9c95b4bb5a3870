//! Structural self-check of a tree.

use std::collections::HashSet;

use crate::boundary::Envelope;

use super::rtree_types::{NodeContent, NodeId};
use super::tree_core::TreeCore;

/// Result of an integrity check
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Nodes reached from the root
    pub nodes_checked: u64,
    /// Leaf entries reached from the root
    pub entries_checked: u64,
    /// True if no violation was found
    pub is_valid: bool,
    /// One message per violation
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_checked: 0,
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeCore {
    /// Verifies, for every node reachable from the root:
    /// - the envelope is the exact union of the contents
    /// - non-root nodes hold between `m` and `M` items, the root at most `M`
    ///   and, when it is a branch, at least two children
    /// - all leaves sit at level 0 and each child is one level below its parent
    /// - parent back links point at the owning branch
    /// - Hilbert rank intervals and content order are consistent
    ///
    /// and that the entry count and the number of live arena nodes match
    /// what the walk found.
    pub(crate) fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();
        let mut visited = HashSet::new();

        match self.nodes.get(self.root) {
            Some(root) => {
                if root.parent.is_some() {
                    report.fail(format!("root {} has a parent link", self.root));
                }
                if !root.is_leaf() && root.len() < 2 {
                    report.fail(format!(
                        "branch root {} has {} children",
                        self.root,
                        root.len()
                    ));
                }
                self.check_node(self.root, root.level, &mut visited, &mut report);
            }
            None => {
                report.fail(format!("root {} is not allocated", self.root));
                return report;
            }
        }

        if report.entries_checked != self.entry_count {
            report.fail(format!(
                "tree counts {} entries but {} are reachable",
                self.entry_count, report.entries_checked
            ));
        }
        if visited.len() != self.nodes.live() {
            report.fail(format!(
                "{} nodes are allocated but {} are reachable",
                self.nodes.live(),
                visited.len()
            ));
        }
        report
    }

    fn check_node(
        &self,
        node_id: NodeId,
        expected_level: u32,
        visited: &mut HashSet<NodeId>,
        report: &mut IntegrityReport,
    ) {
        let Some(node) = self.nodes.get(node_id) else {
            report.fail(format!("node {} is referenced but not allocated", node_id));
            return;
        };
        if !visited.insert(node_id) {
            report.fail(format!("node {} is reachable twice", node_id));
            return;
        }
        report.nodes_checked += 1;

        if node.level != expected_level {
            report.fail(format!(
                "node {} is at level {}, expected {}",
                node_id, node.level, expected_level
            ));
        }
        if node.is_leaf() != (node.level == 0) {
            report.fail(format!(
                "node {} at level {} is {}",
                node_id,
                node.level,
                if node.is_leaf() { "a leaf" } else { "a branch" }
            ));
        }

        let len = node.len();
        if len > self.max_entries {
            report.fail(format!("node {} overflows with {} items", node_id, len));
        }
        if node_id != self.root && len < self.min_entries {
            report.fail(format!("node {} underflows with {} items", node_id, len));
        }

        let ordered = self.factory.is_ordered();
        let mut union = Envelope::empty(self.dimension);
        let mut low = u64::MAX;
        let mut high = 0;
        match &node.content {
            NodeContent::Leaf(entries) => {
                report.entries_checked += entries.len() as u64;
                for entry in entries {
                    if entry.envelope.dimension() != self.dimension {
                        report.fail(format!(
                            "entry {} in node {} has {} axes",
                            entry.id,
                            node_id,
                            entry.envelope.dimension()
                        ));
                        continue;
                    }
                    union.expand(&entry.envelope);
                    low = low.min(entry.rank);
                    high = high.max(entry.rank);
                }
                if ordered && entries.windows(2).any(|w| w[0].rank > w[1].rank) {
                    report.fail(format!("leaf {} is not in Hilbert order", node_id));
                }
            }
            NodeContent::Branch(children) => {
                let mut previous_high = 0;
                for &child_id in children {
                    let Some(child) = self.nodes.get(child_id) else {
                        report.fail(format!(
                            "node {} references freed node {}",
                            node_id, child_id
                        ));
                        continue;
                    };
                    if child.parent != Some(node_id) {
                        report.fail(format!(
                            "node {} links to parent {:?} but is owned by {}",
                            child_id, child.parent, node_id
                        ));
                    }
                    union.expand(&child.envelope);
                    let (child_low, child_high) = child.rank_range();
                    low = low.min(child_low);
                    high = high.max(child_high);
                    if ordered && child_high < previous_high {
                        report.fail(format!("branch {} is not in Hilbert order", node_id));
                    }
                    previous_high = child_high;

                    self.check_node(
                        child_id,
                        expected_level.saturating_sub(1),
                        visited,
                        report,
                    );
                }
            }
        }

        if node.envelope != union {
            report.fail(format!(
                "node {} envelope {} is not the union {} of its contents",
                node_id, node.envelope, union
            ));
        }
        if ordered && node.rank_range() != (low, high) {
            report.fail(format!(
                "node {} rank interval {:?} differs from its contents {:?}",
                node_id,
                node.rank_range(),
                (low, high)
            ));
        }
    }
}
