//! R*-tree strategy (Beckmann et al., 1990).

use crate::boundary::Envelope;

use super::{least_enlargement, ChooseContext, InsertionStrategy, Partition, SplitCandidate};

/// Overlap-aware subtree choice, forced reinsertion and margin-driven split.
#[derive(Debug, Clone, Copy)]
pub struct StarStrategy {
    reinsert_fraction: f64,
}

impl StarStrategy {
    /// `reinsert_fraction` is the share of an overflowing node's items that
    /// are reinserted before resorting to a split.
    pub fn new(reinsert_fraction: f64) -> Self {
        StarStrategy { reinsert_fraction }
    }

    pub fn reinsert_fraction(&self) -> f64 {
        self.reinsert_fraction
    }
}

impl InsertionStrategy for StarStrategy {
    fn name(&self) -> &'static str {
        "R*"
    }

    fn choose_subtree(&self, context: &ChooseContext<'_>) -> usize {
        if context.level != 1 {
            return least_enlargement(context.envelope, context.children);
        }

        // Children are leaves: minimize the overlap increase with siblings.
        let children = context.children;
        let mut best = 0;
        let mut best_key = (f64::INFINITY, f64::INFINITY, f64::INFINITY);
        for (i, child) in children.iter().enumerate() {
            let grown = child.envelope.union(context.envelope);
            let overlap_increase: f64 = children
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, other)| {
                    grown.overlap(other.envelope) - child.envelope.overlap(other.envelope)
                })
                .sum();
            let key = (
                overlap_increase,
                grown.volume() - child.envelope.volume(),
                child.envelope.volume(),
            );
            if key < best_key {
                best = i;
                best_key = key;
            }
        }
        best
    }

    fn split(&self, candidates: &[SplitCandidate<'_>], min_entries: usize) -> Partition {
        let n = candidates.len();
        let min = min_entries.clamp(1, n / 2);
        let dimension = candidates[0].envelope.dimension();

        // Pick the axis with the smallest total margin over all distributions.
        let mut best_axis = 0;
        let mut best_margin = f64::INFINITY;
        for axis in 0..dimension {
            let margin: f64 = axis_sorts(candidates, axis)
                .iter()
                .map(|order| {
                    Distributions::new(candidates, order)
                        .iter(min)
                        .map(|(_, lower, upper)| lower.margin() + upper.margin())
                        .sum::<f64>()
                })
                .sum();
            if margin < best_margin {
                best_margin = margin;
                best_axis = axis;
            }
        }

        // On that axis, the distribution with least overlap, then least volume.
        let mut best: Option<(Vec<usize>, usize)> = None;
        let mut best_key = (f64::INFINITY, f64::INFINITY);
        for order in axis_sorts(candidates, best_axis) {
            let mut chosen = None;
            for (k, lower, upper) in Distributions::new(candidates, &order).iter(min) {
                let key = (lower.overlap(upper), lower.volume() + upper.volume());
                if key < best_key {
                    best_key = key;
                    chosen = Some(k);
                }
            }
            if let Some(k) = chosen {
                best = Some((order, k));
            }
        }

        match best {
            Some((order, k)) => Partition {
                left: order[..k].to_vec(),
                right: order[k..].to_vec(),
            },
            None => Partition {
                left: (0..min).collect(),
                right: (min..n).collect(),
            },
        }
    }

    fn reinsert_selection(
        &self,
        node: &Envelope,
        candidates: &[SplitCandidate<'_>],
        min_entries: usize,
    ) -> Option<Vec<usize>> {
        let n = candidates.len();
        if n <= min_entries + 1 {
            return None;
        }
        let count = ((self.reinsert_fraction * n as f64).round() as usize).clamp(1, n - min_entries);

        let mut by_distance: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.envelope.center_distance_sq(node)))
            .collect();
        // Farthest first.
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut selected: Vec<usize> = by_distance[..count].iter().map(|(i, _)| *i).collect();
        // Close reinsert: the nearest of the removed items goes back first.
        selected.reverse();
        Some(selected)
    }
}

/// Candidate indices sorted by lower bound and by upper bound along `axis`.
fn axis_sorts(candidates: &[SplitCandidate<'_>], axis: usize) -> [Vec<usize>; 2] {
    let by = |key: fn(&Envelope, usize) -> (f64, f64)| {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| {
            let ka = key(candidates[a].envelope, axis);
            let kb = key(candidates[b].envelope, axis);
            ka.0.total_cmp(&kb.0)
                .then(ka.1.total_cmp(&kb.1))
                .then(a.cmp(&b))
        });
        order
    };
    [
        by(|e, axis| (e.min(axis), e.max(axis))),
        by(|e, axis| (e.max(axis), e.min(axis))),
    ]
}

/// Prefix and suffix envelopes of one sort order, so every split point
/// `k` can be evaluated in constant time.
struct Distributions {
    prefix: Vec<Envelope>,
    suffix: Vec<Envelope>,
}

impl Distributions {
    fn new(candidates: &[SplitCandidate<'_>], order: &[usize]) -> Self {
        let n = order.len();
        let dimension = candidates[0].envelope.dimension();

        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(Envelope::empty(dimension));
        for &i in order {
            let next = prefix[prefix.len() - 1].union(candidates[i].envelope);
            prefix.push(next);
        }

        let mut suffix = vec![Envelope::empty(dimension); n + 1];
        for pos in (0..n).rev() {
            suffix[pos] = suffix[pos + 1].union(candidates[order[pos]].envelope);
        }

        Distributions { prefix, suffix }
    }

    /// `(k, lower group envelope, upper group envelope)` for `k` in `min..=n-min`.
    fn iter(&self, min: usize) -> impl Iterator<Item = (usize, &Envelope, &Envelope)> + '_ {
        let n = self.prefix.len() - 1;
        (min..=n.saturating_sub(min)).map(move |k| (k, &self.prefix[k], &self.suffix[k]))
    }
}
