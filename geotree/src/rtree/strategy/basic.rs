//! Guttman's R-tree: least-enlargement descent with linear or quadratic split.

use super::{
    distribute, least_enlargement, ChooseContext, InsertionStrategy, Partition, SplitCandidate,
};

/// Linear-cost split: seeds are the pair with the greatest normalized
/// separation along any axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSplit;

/// Quadratic-cost split: seeds are the pair that would waste the most volume
/// if grouped together.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadraticSplit;

impl InsertionStrategy for LinearSplit {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn choose_subtree(&self, context: &ChooseContext<'_>) -> usize {
        least_enlargement(context.envelope, context.children)
    }

    fn split(&self, candidates: &[SplitCandidate<'_>], min_entries: usize) -> Partition {
        distribute(candidates, linear_seeds(candidates), min_entries, false)
    }
}

impl InsertionStrategy for QuadraticSplit {
    fn name(&self) -> &'static str {
        "quadratic"
    }

    fn choose_subtree(&self, context: &ChooseContext<'_>) -> usize {
        least_enlargement(context.envelope, context.children)
    }

    fn split(&self, candidates: &[SplitCandidate<'_>], min_entries: usize) -> Partition {
        distribute(candidates, quadratic_seeds(candidates), min_entries, true)
    }
}

fn linear_seeds(candidates: &[SplitCandidate<'_>]) -> (usize, usize) {
    let dimension = candidates[0].envelope.dimension();
    let mut best = (0, 1);
    let mut best_separation = f64::NEG_INFINITY;

    for axis in 0..dimension {
        let mut highest_low = 0;
        let mut overall_min = f64::INFINITY;
        let mut overall_max = f64::NEG_INFINITY;
        for (i, c) in candidates.iter().enumerate() {
            let (min, max) = c.envelope.range(axis);
            if min > candidates[highest_low].envelope.min(axis) {
                highest_low = i;
            }
            overall_min = overall_min.min(min);
            overall_max = overall_max.max(max);
        }

        let mut lowest_high = if highest_low == 0 { 1 } else { 0 };
        for (i, c) in candidates.iter().enumerate() {
            if i != highest_low && c.envelope.max(axis) < candidates[lowest_high].envelope.max(axis)
            {
                lowest_high = i;
            }
        }

        let width = overall_max - overall_min;
        // Degenerate axis: every candidate shares one coordinate.
        let separation = if width > 0.0 {
            (candidates[highest_low].envelope.min(axis) - candidates[lowest_high].envelope.max(axis))
                / width
        } else {
            0.0
        };

        if separation > best_separation {
            best_separation = separation;
            best = (lowest_high, highest_low);
        }
    }
    best
}

fn quadratic_seeds(candidates: &[SplitCandidate<'_>]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut worst_waste = f64::NEG_INFINITY;
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let a = candidates[i].envelope;
            let b = candidates[j].envelope;
            let waste = a.union(b).volume() - a.volume() - b.volume();
            if waste > worst_waste {
                worst_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}
