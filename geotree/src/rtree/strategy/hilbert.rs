//! Hilbert R-tree strategy (Kamel and Faloutsos, 1994).
//!
//! Node contents are kept sorted by Hilbert rank by the skeleton, so a split
//! never measures geometry: the lower half of the ranks stays, the upper
//! half moves to the new sibling.

use super::{ChooseContext, InsertionStrategy, Partition, SplitCandidate};

#[derive(Debug, Clone, Copy, Default)]
pub struct HilbertStrategy;

impl InsertionStrategy for HilbertStrategy {
    fn name(&self) -> &'static str {
        "Hilbert"
    }

    /// The child whose rank interval holds the rank, else the child with the
    /// nearest interval bound (first one on ties).
    fn choose_subtree(&self, context: &ChooseContext<'_>) -> usize {
        let rank = context.rank;
        let mut best = 0;
        let mut best_distance = u64::MAX;
        for (i, child) in context.children.iter().enumerate() {
            let distance = if rank < child.low_rank {
                child.low_rank - rank
            } else {
                rank.saturating_sub(child.high_rank)
            };
            if distance == 0 {
                return i;
            }
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        best
    }

    fn split(&self, candidates: &[SplitCandidate<'_>], _min_entries: usize) -> Partition {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&i| candidates[i].rank);
        let right = order.split_off(candidates.len() / 2);
        Partition { left: order, right }
    }
}
