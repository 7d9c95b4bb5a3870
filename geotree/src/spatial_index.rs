//! Object-level spatial index: an [`RTree`] plus an [`ElementMapper`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::Mutex;

use crate::boundary::Boundary;
use crate::element_mapper::ElementMapper;
use crate::predicate::SpatialPredicate;
use crate::rtree::rtree_types::{EntryId, IndexResult};
use crate::rtree::RTree;
use crate::spatial_tree::SpatialTree;

/// Indexes application objects by their boundary.
///
/// Objects are given compact identifiers from a counter; the mapper keeps
/// the object/identifier association and the tree stores the identifiers.
/// Query hits are resolved back to objects through the mapper.
///
/// # Examples
///
/// ```rust
/// use geotree::{
///     Boundary, CoordinateSystem, HashElementMapper, RTree, RTreeConfig, SpatialIndex,
/// };
///
/// let crs = CoordinateSystem::cartesian(2).shared();
/// let tree = RTree::new(crs.clone(), RTreeConfig::default()).unwrap();
/// let point_crs = crs.clone();
/// let mapper = HashElementMapper::new(move |&(x, y): &(i64, i64)| {
///     Boundary::point(point_crs.clone(), &[x as f64, y as f64])
/// });
/// let index = SpatialIndex::new(tree, mapper);
///
/// index.insert(&(1, 1)).unwrap();
/// index.insert(&(8, 8)).unwrap();
///
/// let window = Boundary::new(crs, [(0.0, 2.0), (0.0, 2.0)]).unwrap();
/// assert_eq!(index.search(&window).unwrap(), vec![(1, 1)]);
/// ```
pub struct SpatialIndex<T, M>
where
    M: ElementMapper<T>,
{
    tree: RTree,
    mapper: M,
    next_id: AtomicU64,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, M> SpatialIndex<T, M>
where
    M: ElementMapper<T>,
{
    /// Wraps an empty tree and mapper.
    pub fn new(tree: RTree, mapper: M) -> Self {
        SpatialIndex {
            tree,
            mapper,
            next_id: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    /// Indexes `object`. Returns `false` if it was already indexed.
    ///
    /// If the tree rejects the boundary, the identifier registration is
    /// rolled back and the error returned.
    pub fn insert(&self, object: &T) -> IndexResult<bool> {
        let _guard = self.write_lock.lock();
        if self.mapper.tree_identifier(object).is_some() {
            return Ok(false);
        }
        let boundary = self.mapper.envelope(object)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.mapper.set_tree_identifier(object, id)?;
        if let Err(e) = self.tree.insert(&boundary, id) {
            self.mapper.remove_tree_identifier(id);
            return Err(e);
        }
        trace!("indexed object as entry {}", id);
        Ok(true)
    }

    /// Removes `object`. Returns `false` if it was not indexed.
    pub fn remove(&self, object: &T) -> IndexResult<bool> {
        let _guard = self.write_lock.lock();
        let Some(id) = self.mapper.tree_identifier(object) else {
            return Ok(false);
        };
        let boundary = self.mapper.envelope(object)?;
        let removed = self.tree.remove(&boundary, id)?;
        self.mapper.remove_tree_identifier(id);
        Ok(removed)
    }

    pub fn contains(&self, object: &T) -> bool {
        self.mapper.tree_identifier(object).is_some()
    }

    /// Objects whose boundary intersects `query`.
    pub fn search(&self, query: &Boundary) -> IndexResult<Vec<T>> {
        let ids = self.tree.find_intersecting_keys(query)?;
        Ok(self.resolve(ids))
    }

    /// Objects whose boundary satisfies `predicate` against `query`.
    pub fn find(&self, predicate: SpatialPredicate, query: &Boundary) -> IndexResult<Vec<T>> {
        let ids = self.tree.find(predicate, query)?;
        Ok(self.resolve(ids))
    }

    /// The `k` objects nearest to `point` with their distances, nearest first.
    pub fn find_nearest(
        &self,
        point: &[f64],
        k: usize,
        max_distance: Option<f64>,
    ) -> IndexResult<Vec<(T, f64)>> {
        let hits = self.tree.find_nearest(point, k, max_distance)?;
        Ok(hits
            .into_iter()
            .filter_map(|(id, distance)| {
                self.mapper
                    .object_from_tree_identifier(id)
                    .map(|object| (object, distance))
            })
            .collect())
    }

    /// Number of indexed objects.
    pub fn len(&self) -> u64 {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every object from both the tree and the mapper.
    pub fn clear(&self) -> IndexResult<()> {
        let _guard = self.write_lock.lock();
        self.tree.clear()?;
        self.mapper.clear();
        Ok(())
    }

    pub fn tree(&self) -> &RTree {
        &self.tree
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    fn resolve(&self, ids: Vec<EntryId>) -> Vec<T> {
        ids.into_iter()
            .filter_map(|id| self.mapper.object_from_tree_identifier(id))
            .collect()
    }
}

impl<T, M> fmt::Debug for SpatialIndex<T, M>
where
    M: ElementMapper<T> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("tree", &self.tree)
            .field("mapper", &self.mapper)
            .finish()
    }
}
