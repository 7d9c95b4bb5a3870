//! Topological predicates evaluated on bounding boxes.
//!
//! Every predicate compares the envelope of an indexed entry (the
//! *candidate*) with the query envelope. The results are box-level
//! approximations: two geometries whose boxes overlap may still be disjoint.
//! Callers needing exact topology filter the returned ids with real
//! geometry.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::boundary::Envelope;
use crate::rtree::rtree_types::{EntryId, LeafEntry};
use crate::rtree::tree_core::TreeCore;

/// A relation between a candidate box and a query box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialPredicate {
    /// The boxes share at least one point
    Intersects,
    /// The candidate contains the query and is not equal to it
    Contains,
    /// The query contains the candidate and is not equal to it
    Within,
    /// The boxes share no point
    Disjoint,
    /// The boxes intersect with zero overlap along at least one axis
    Touches,
    /// Every bound matches within the equality tolerance
    Equals,
    /// The boxes intersect with positive overlap along every axis
    Overlaps,
}

impl fmt::Display for SpatialPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpatialPredicate::Intersects => "INTERSECTS",
            SpatialPredicate::Contains => "CONTAINS",
            SpatialPredicate::Within => "WITHIN",
            SpatialPredicate::Disjoint => "DISJOINT",
            SpatialPredicate::Touches => "TOUCHES",
            SpatialPredicate::Equals => "EQUALS",
            SpatialPredicate::Overlaps => "OVERLAPS",
        };
        f.write_str(name)
    }
}

impl SpatialPredicate {
    /// Evaluates the predicate for a single pair of boxes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use geotree::{Envelope, SpatialPredicate};
    ///
    /// let a = Envelope::from_ranges([(0.0, 10.0), (0.0, 10.0)]);
    /// let b = Envelope::from_ranges([(10.0, 20.0), (0.0, 10.0)]);
    ///
    /// assert!(SpatialPredicate::Touches.matches(&a, &b, 0.0));
    /// assert!(!SpatialPredicate::Overlaps.matches(&a, &b, 0.0));
    /// ```
    pub fn matches(&self, candidate: &Envelope, query: &Envelope, tolerance: f64) -> bool {
        match self {
            SpatialPredicate::Intersects => candidate.intersects(query),
            SpatialPredicate::Contains => {
                candidate.contains(query) && !candidate.approx_eq(query, tolerance)
            }
            SpatialPredicate::Within => {
                query.contains(candidate) && !candidate.approx_eq(query, tolerance)
            }
            SpatialPredicate::Disjoint => !candidate.intersects(query),
            SpatialPredicate::Touches => {
                candidate.intersects(query)
                    && (0..candidate.dimension())
                        .any(|axis| candidate.overlap_extent(query, axis) == 0.0)
            }
            SpatialPredicate::Equals => candidate.approx_eq(query, tolerance),
            SpatialPredicate::Overlaps => {
                candidate.intersects(query)
                    && (0..candidate.dimension())
                        .all(|axis| candidate.overlap_extent(query, axis) > 0.0)
            }
        }
    }
}

/// Ids of all entries of `core` satisfying `predicate` against `query`.
///
/// DISJOINT is the complement of a range search: every indexed id minus the
/// ids the range search returns. EQUALS searches a window grown by the
/// tolerance, so near-equal boxes that do not touch the query are found.
/// All other predicates imply intersection and filter a plain range search.
pub(crate) fn evaluate(
    core: &TreeCore,
    predicate: SpatialPredicate,
    query: &Envelope,
    tolerance: f64,
) -> Vec<EntryId> {
    let mut ids = Vec::new();
    match predicate {
        SpatialPredicate::Disjoint => {
            let mut hits = HashSet::new();
            let _ = core.search(query, &mut |entry: &LeafEntry| {
                hits.insert(entry.id);
                ControlFlow::Continue(())
            });
            core.for_each_entry(&mut |entry: &LeafEntry| {
                if !hits.contains(&entry.id) {
                    ids.push(entry.id);
                }
            });
        }
        SpatialPredicate::Equals => {
            let window = Envelope::from_ranges(
                query
                    .ranges()
                    .iter()
                    .map(|(min, max)| (min - tolerance, max + tolerance)),
            );
            let _ = core.search(&window, &mut |entry: &LeafEntry| {
                if predicate.matches(&entry.envelope, query, tolerance) {
                    ids.push(entry.id);
                }
                ControlFlow::Continue(())
            });
        }
        _ => {
            let _ = core.search(query, &mut |entry: &LeafEntry| {
                if predicate.matches(&entry.envelope, query, tolerance) {
                    ids.push(entry.id);
                }
                ControlFlow::Continue(())
            });
        }
    }
    ids
}
