//! RTree handle: a shareable, lock-protected tree of one variant.

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::boundary::{same_coordinate_system, Boundary, Envelope};
use crate::coordinate_system::CoordinateSystem;
use crate::hilbert::HilbertCurve;
use crate::predicate::{self, SpatialPredicate};
use crate::search::{SearchOutcome, SearchVisitor};
use crate::spatial_tree::SpatialTree;

use super::integrity::IntegrityReport;
use super::node_ref::TreeReadGuard;
use super::node_store::NodeFactory;
use super::rtree_config::{RTreeConfig, TreeVariant};
use super::rtree_constants::DEFAULT_HILBERT_ORDER;
use super::rtree_types::{EntryId, IndexError, IndexResult, LeafEntry, RTreeStats};
use super::strategy::strategy_for;
use super::tree_core::TreeCore;

/// An R-tree over n-dimensional boundaries of one coordinate system.
///
/// Cloning the handle is cheap and every clone sees the same tree. Writes
/// (`insert`, `remove`, `clear`) take an exclusive lock, so there is always
/// a single writer; searches take a shared lock and run concurrently.
///
/// # Examples
///
/// ```rust
/// use geotree::{Boundary, CoordinateSystem, RTree, RTreeConfig, SpatialTree, TreeVariant};
///
/// let crs = CoordinateSystem::cartesian(2).shared();
/// let tree = RTree::new(crs.clone(), RTreeConfig::new(TreeVariant::Star)).unwrap();
///
/// tree.insert(&Boundary::new(crs.clone(), [(0.0, 1.0), (0.0, 1.0)]).unwrap(), 1).unwrap();
/// tree.insert(&Boundary::new(crs.clone(), [(5.0, 6.0), (5.0, 6.0)]).unwrap(), 2).unwrap();
///
/// let query = Boundary::new(crs, [(0.5, 2.0), (0.5, 2.0)]).unwrap();
/// assert_eq!(tree.find_intersecting_keys(&query).unwrap(), vec![1]);
/// ```
#[derive(Clone)]
pub struct RTree {
    inner: Arc<RTreeInner>,
}

struct RTreeInner {
    core: RwLock<TreeCore>,
    crs: Arc<CoordinateSystem>,
    config: RTreeConfig,
}

impl RTree {
    /// Creates an empty tree.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if the configuration does not validate, or if
    /// the Hilbert variant has no working extent: neither
    /// `config.hilbert_extent` nor bounded axis domains on `crs`.
    pub fn new(crs: Arc<CoordinateSystem>, config: RTreeConfig) -> IndexResult<Self> {
        let dimension = crs.dimension();
        config.validate(dimension)?;

        let factory = match config.variant {
            TreeVariant::Hilbert => {
                let extent = config
                    .hilbert_extent
                    .clone()
                    .or_else(|| crs.domain_envelope())
                    .ok_or_else(|| {
                        IndexError::InvalidConfiguration(format!(
                            "Hilbert tree over {} needs a working extent, set hilbert_extent",
                            crs.name()
                        ))
                    })?;
                NodeFactory::Hilbert(HilbertCurve::new(extent, config.hilbert_order)?)
            }
            TreeVariant::Basic(_) | TreeVariant::Star => NodeFactory::Plain,
        };
        let strategy = strategy_for(config.variant, config.reinsert_fraction);

        debug!(
            "created {} R-tree over {} (m = {}, M = {})",
            config.variant.name(),
            crs,
            config.min_entries,
            config.max_entries
        );

        let core = TreeCore::new(
            dimension,
            config.min_entries,
            config.max_entries,
            factory,
            strategy,
        );
        Ok(RTree {
            inner: Arc::new(RTreeInner {
                core: RwLock::new(core),
                crs,
                config,
            }),
        })
    }

    /// Builds a tree from a batch of entries.
    ///
    /// Entries are inserted in Hilbert order of their centers over the
    /// extent of the whole batch, which keeps neighbors in the same nodes.
    /// A Hilbert tree without a configured extent uses the batch extent.
    pub fn bulk_load<I>(
        crs: Arc<CoordinateSystem>,
        mut config: RTreeConfig,
        entries: I,
    ) -> IndexResult<Self>
    where
        I: IntoIterator<Item = (Boundary, EntryId)>,
    {
        let mut batch: Vec<(Envelope, EntryId)> = Vec::new();
        let mut extent = Envelope::empty(crs.dimension());
        for (boundary, id) in entries {
            check_boundary(&crs, &boundary)?;
            let envelope = boundary.into_envelope();
            extent.expand(&envelope);
            batch.push((envelope, id));
        }

        if config.variant == TreeVariant::Hilbert
            && config.hilbert_extent.is_none()
            && crs.domain_envelope().is_none()
            && !extent.is_empty()
        {
            config.hilbert_extent = Some(extent.clone());
        }
        let tree = RTree::new(crs, config)?;
        if batch.is_empty() {
            return Ok(tree);
        }

        let curve = HilbertCurve::new(extent, DEFAULT_HILBERT_ORDER)?;
        let mut ranked: Vec<(u64, Envelope, EntryId)> = batch
            .into_iter()
            .map(|(envelope, id)| (curve.rank_of(&envelope), envelope, id))
            .collect();
        ranked.sort_by_key(|entry| entry.0);

        {
            let mut core = tree.inner.core.write();
            for (_, envelope, id) in ranked {
                core.insert(envelope, id)?;
            }
            debug!(
                "bulk loaded {} entries, tree height {}",
                core.len(),
                core.height()
            );
        }
        Ok(tree)
    }

    pub fn config(&self) -> &RTreeConfig {
        &self.inner.config
    }

    pub fn variant(&self) -> TreeVariant {
        self.inner.config.variant
    }

    /// Shared access to the node structure.
    pub fn read(&self) -> TreeReadGuard<'_> {
        TreeReadGuard::new(self.inner.core.read(), &self.inner.crs)
    }

    /// Boundary of the root: the union of every indexed boundary. Empty
    /// (`min > max` on every axis) for an empty tree.
    pub fn root_boundary(&self) -> Boundary {
        let core = self.inner.core.read();
        Boundary::from_trusted(self.inner.crs.clone(), core.root_envelope().clone())
    }

    /// Number of levels, 1 for an empty tree.
    pub fn height(&self) -> u32 {
        self.inner.core.read().height()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.core.read().len() == 0
    }

    /// Every indexed `(id, boundary)` pair, in tree order.
    pub fn entries(&self) -> Vec<(EntryId, Boundary)> {
        let core = self.inner.core.read();
        let mut entries = Vec::with_capacity(core.len() as usize);
        core.for_each_entry(&mut |entry: &LeafEntry| {
            entries.push((
                entry.id,
                Boundary::from_trusted(self.inner.crs.clone(), entry.envelope.clone()),
            ));
        });
        entries
    }

    pub fn stats(&self) -> RTreeStats {
        self.inner.core.read().stats()
    }

    /// Verifies the structural invariants of the tree.
    pub fn check_integrity(&self) -> IntegrityReport {
        self.inner.core.read().check_integrity()
    }

    fn envelope_of<'b>(&self, boundary: &'b Boundary) -> IndexResult<&'b Envelope> {
        check_boundary(&self.inner.crs, boundary)?;
        Ok(boundary.envelope())
    }
}

/// Dimension is checked before coordinate system identity, so a boundary
/// with the wrong axis count always reports `DimensionMismatch`.
fn check_boundary(crs: &Arc<CoordinateSystem>, boundary: &Boundary) -> IndexResult<()> {
    if boundary.dimension() != crs.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: crs.dimension(),
            actual: boundary.dimension(),
        });
    }
    same_coordinate_system(crs, boundary.coordinate_system())
}

impl SpatialTree for RTree {
    fn insert(&self, boundary: &Boundary, id: EntryId) -> IndexResult<()> {
        let envelope = self.envelope_of(boundary)?.clone();
        self.inner.core.write().insert(envelope, id)
    }

    fn remove(&self, boundary: &Boundary, id: EntryId) -> IndexResult<bool> {
        let envelope = self.envelope_of(boundary)?;
        self.inner.core.write().remove(envelope, id)
    }

    fn search(
        &self,
        query: &Boundary,
        visitor: &mut dyn SearchVisitor,
    ) -> IndexResult<SearchOutcome> {
        let envelope = self.envelope_of(query)?;
        let core = self.inner.core.read();
        let flow = core.search(envelope, &mut |entry: &LeafEntry| {
            visitor.visit(entry.id, &entry.envelope)
        });
        Ok(flow.into())
    }

    fn find(&self, predicate: SpatialPredicate, query: &Boundary) -> IndexResult<Vec<EntryId>> {
        let envelope = self.envelope_of(query)?;
        let core = self.inner.core.read();
        Ok(predicate::evaluate(
            &core,
            predicate,
            envelope,
            self.inner.config.equals_tolerance,
        ))
    }

    fn find_nearest(
        &self,
        point: &[f64],
        k: usize,
        max_distance: Option<f64>,
    ) -> IndexResult<Vec<(EntryId, f64)>> {
        if point.len() != self.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension(),
                actual: point.len(),
            });
        }
        if point.iter().any(|c| !c.is_finite()) {
            return Err(IndexError::InvalidOperation(
                "nearest neighbor query point must be finite".into(),
            ));
        }
        Ok(self.inner.core.read().find_nearest(point, k, max_distance))
    }

    fn size(&self) -> u64 {
        self.inner.core.read().len()
    }

    fn clear(&self) -> IndexResult<()> {
        self.inner.core.write().clear();
        debug!("cleared {} R-tree", self.inner.config.variant.name());
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.inner.crs.dimension()
    }

    fn coordinate_system(&self) -> &Arc<CoordinateSystem> {
        &self.inner.crs
    }
}

impl std::fmt::Debug for RTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.read();
        f.debug_struct("RTree")
            .field("strategy", &core.strategy_name())
            .field("coordinate_system", &self.inner.crs.name())
            .field("size", &core.len())
            .finish()
    }
}
