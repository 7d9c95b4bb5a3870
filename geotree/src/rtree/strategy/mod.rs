//! Insertion strategies of the R-tree family.
//!
//! The tree skeleton owns the nodes and every structural change. A strategy
//! only looks at lightweight summaries of a node's contents and answers three
//! questions:
//!
//! - which child should receive a new item ([`InsertionStrategy::choose_subtree`])
//! - how an overflowing node is partitioned ([`InsertionStrategy::split`])
//! - whether some items should be reinserted instead of splitting
//!   ([`InsertionStrategy::reinsert_selection`])
//!
//! Answers are indices into the summaries; the skeleton applies them.

mod basic;
mod hilbert;
mod star;

use std::fmt::Debug;

use crate::boundary::Envelope;

use super::rtree_config::{SplitAlgorithm, TreeVariant};

pub use basic::{LinearSplit, QuadraticSplit};
pub use hilbert::HilbertStrategy;
pub use star::StarStrategy;

/// A child of the node being descended.
#[derive(Debug, Clone, Copy)]
pub struct ChildSummary<'a> {
    pub envelope: &'a Envelope,
    /// Lowest Hilbert rank below the child (zero for unordered variants)
    pub low_rank: u64,
    /// Highest Hilbert rank below the child (zero for unordered variants)
    pub high_rank: u64,
}

/// Input of a subtree choice.
#[derive(Debug, Clone, Copy)]
pub struct ChooseContext<'a> {
    /// Envelope of the item being inserted
    pub envelope: &'a Envelope,
    /// Hilbert rank of the item being inserted
    pub rank: u64,
    /// Level of the node being descended; its children sit one level lower
    pub level: u32,
    pub children: &'a [ChildSummary<'a>],
}

/// An item of an overflowing node.
#[derive(Debug, Clone, Copy)]
pub struct SplitCandidate<'a> {
    pub envelope: &'a Envelope,
    pub rank: u64,
}

/// Two groups of candidate indices. The left group stays in the
/// overflowing node, the right group moves to a new sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

/// Subtree choice and overflow policy of one tree variant.
pub trait InsertionStrategy: Send + Sync + Debug {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Index of the child of `context.children` that receives the item.
    /// `context.children` is never empty.
    fn choose_subtree(&self, context: &ChooseContext<'_>) -> usize;

    /// Partitions `candidates` (more than `2 * min_entries` of them) into two
    /// groups of at least `min_entries` items each. Must terminate with a
    /// valid partition even when every candidate is identical.
    fn split(&self, candidates: &[SplitCandidate<'_>], min_entries: usize) -> Partition;

    /// Items of an overflowing non-root node to remove and reinsert from the
    /// top of the tree instead of splitting, in reinsertion order. `None`
    /// means split right away.
    fn reinsert_selection(
        &self,
        _node: &Envelope,
        _candidates: &[SplitCandidate<'_>],
        _min_entries: usize,
    ) -> Option<Vec<usize>> {
        None
    }
}

/// Builds the strategy of `variant`.
pub fn strategy_for(variant: TreeVariant, reinsert_fraction: f64) -> Box<dyn InsertionStrategy> {
    match variant {
        TreeVariant::Basic(SplitAlgorithm::Linear) => Box::new(LinearSplit),
        TreeVariant::Basic(SplitAlgorithm::Quadratic) => Box::new(QuadraticSplit),
        TreeVariant::Star => Box::new(StarStrategy::new(reinsert_fraction)),
        TreeVariant::Hilbert => Box::new(HilbertStrategy),
    }
}

/// Child needing the least volume enlargement, ties broken by smaller volume.
pub(crate) fn least_enlargement(envelope: &Envelope, children: &[ChildSummary<'_>]) -> usize {
    let mut best = 0;
    let mut best_enlargement = f64::INFINITY;
    let mut best_volume = f64::INFINITY;
    for (i, child) in children.iter().enumerate() {
        let enlargement = child.envelope.enlargement(envelope);
        let volume = child.envelope.volume();
        if enlargement < best_enlargement
            || (enlargement == best_enlargement && volume < best_volume)
        {
            best = i;
            best_enlargement = enlargement;
            best_volume = volume;
        }
    }
    best
}

/// Guttman's group assignment shared by the linear and quadratic splits.
///
/// Starts two groups from `seeds` and assigns the remaining candidates by
/// smaller enlargement (ties: smaller group, then smaller resulting volume).
/// With `pick_next` the candidate with the strongest preference for one group
/// goes first; otherwise candidates are taken in order. Once a group needs
/// every remaining candidate to reach `min_entries` it receives all of them.
pub(crate) fn distribute(
    candidates: &[SplitCandidate<'_>],
    seeds: (usize, usize),
    min_entries: usize,
    pick_next: bool,
) -> Partition {
    let (a, b) = seeds;
    let mut left = vec![a];
    let mut right = vec![b];
    let mut left_env = candidates[a].envelope.clone();
    let mut right_env = candidates[b].envelope.clone();
    let mut remaining: Vec<usize> = (0..candidates.len()).filter(|&i| i != a && i != b).collect();

    while !remaining.is_empty() {
        if left.len() + remaining.len() <= min_entries {
            left.append(&mut remaining);
            break;
        }
        if right.len() + remaining.len() <= min_entries {
            right.append(&mut remaining);
            break;
        }

        let pos = if pick_next {
            let mut best = 0;
            let mut best_diff = f64::NEG_INFINITY;
            for (pos, &i) in remaining.iter().enumerate() {
                let e = candidates[i].envelope;
                let diff = (left_env.enlargement(e) - right_env.enlargement(e)).abs();
                if diff > best_diff {
                    best = pos;
                    best_diff = diff;
                }
            }
            best
        } else {
            0
        };
        let i = remaining.swap_remove(pos);
        let e = candidates[i].envelope;

        let d_left = left_env.enlargement(e);
        let d_right = right_env.enlargement(e);
        let to_left = if d_left != d_right {
            d_left < d_right
        } else if left.len() != right.len() {
            left.len() < right.len()
        } else {
            left_env.union(e).volume() <= right_env.union(e).volume()
        };

        if to_left {
            left.push(i);
            left_env.expand(e);
        } else {
            right.push(i);
            right_env.expand(e);
        }
    }

    Partition { left, right }
}
