//! SpatialTree trait definition for spatial indexing.

use std::ops::ControlFlow;
use std::sync::Arc;

use crate::boundary::{Boundary, Envelope};
use crate::coordinate_system::CoordinateSystem;
use crate::predicate::SpatialPredicate;
use crate::rtree::rtree_types::{EntryId, IndexResult};
use crate::search::{CollectVisitor, SearchOutcome, SearchVisitor};

/// An index of `(boundary, id)` pairs.
///
/// Implementations serialize writers internally; every method takes `&self`
/// and can be called from several threads.
pub trait SpatialTree: Send + Sync {
    /// Adds an entry.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` or `CoordinateSystemMismatch` if `boundary` does
    /// not belong to this tree's coordinate system.
    fn insert(&self, boundary: &Boundary, id: EntryId) -> IndexResult<()>;

    /// Removes the entry with this exact boundary and id. Returns `false`
    /// when no such entry is indexed.
    fn remove(&self, boundary: &Boundary, id: EntryId) -> IndexResult<bool>;

    /// Visits every entry intersecting `query`.
    fn search(&self, query: &Boundary, visitor: &mut dyn SearchVisitor)
        -> IndexResult<SearchOutcome>;

    /// Ids of the entries intersecting `query`.
    fn find_intersecting_keys(&self, query: &Boundary) -> IndexResult<Vec<EntryId>> {
        let mut visitor = CollectVisitor::new();
        self.search(query, &mut visitor)?;
        Ok(visitor.into_ids())
    }

    /// Ids of the entries lying inside `query`, boundaries inclusive.
    fn find_contained_keys(&self, query: &Boundary) -> IndexResult<Vec<EntryId>> {
        let window = query.envelope().clone();
        let mut ids = Vec::new();
        self.search(query, &mut |id: EntryId, envelope: &Envelope| {
            if window.contains(envelope) {
                ids.push(id);
            }
            ControlFlow::Continue(())
        })?;
        Ok(ids)
    }

    /// Ids of the entries whose boundary satisfies `predicate` against `query`.
    fn find(&self, predicate: SpatialPredicate, query: &Boundary) -> IndexResult<Vec<EntryId>>;

    /// The `k` entries nearest to `point` as `(id, distance)` pairs, nearest
    /// first, optionally limited to `max_distance`.
    fn find_nearest(
        &self,
        point: &[f64],
        k: usize,
        max_distance: Option<f64>,
    ) -> IndexResult<Vec<(EntryId, f64)>>;

    /// All entries within `distance` of `point`, nearest first.
    fn find_within_distance(
        &self,
        point: &[f64],
        distance: f64,
    ) -> IndexResult<Vec<(EntryId, f64)>> {
        self.find_nearest(point, usize::MAX, Some(distance))
    }

    /// Number of indexed entries.
    fn size(&self) -> u64;

    /// Removes every entry.
    fn clear(&self) -> IndexResult<()>;

    /// Number of axes of every indexed boundary.
    fn dimension(&self) -> usize;

    fn coordinate_system(&self) -> &Arc<CoordinateSystem>;
}
