//! Tree configuration: variant, node capacity and query tolerances.

use serde::{Deserialize, Serialize};

use crate::boundary::Envelope;

use super::rtree_constants::{
    DEFAULT_EQUALS_TOLERANCE, DEFAULT_HILBERT_ORDER, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES,
    DEFAULT_REINSERT_FRACTION,
};
use super::rtree_types::{IndexError, IndexResult};

/// Node splitting heuristic of the basic (Guttman) R-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitAlgorithm {
    /// Seeds by greatest normalized separation, linear cost
    Linear,
    /// Seeds by greatest dead space, quadratic cost
    Quadratic,
}

/// The member of the R-tree family to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeVariant {
    /// Guttman's R-tree with the given split algorithm
    Basic(SplitAlgorithm),
    /// R*-tree: overlap-aware subtree choice, forced reinsertion, margin split
    Star,
    /// Hilbert R-tree: contents ordered by Hilbert rank, median split
    Hilbert,
}

impl TreeVariant {
    /// Short human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            TreeVariant::Basic(SplitAlgorithm::Linear) => "linear",
            TreeVariant::Basic(SplitAlgorithm::Quadratic) => "quadratic",
            TreeVariant::Star => "R*",
            TreeVariant::Hilbert => "Hilbert",
        }
    }
}

/// Configuration of an [`RTree`](crate::RTree).
///
/// A [`TreeVariant::Hilbert`] tree needs a working extent for its curve. It
/// comes from [`hilbert_extent`](RTreeConfig::hilbert_extent) or, when that is
/// unset, from the bounded axis domains of the coordinate system. Unbounded
/// systems such as `CoordinateSystem::cartesian(n)` have no domain, so the
/// extent must be set explicitly there, or the tree built with
/// [`RTree::bulk_load`](crate::RTree::bulk_load), which uses the extent of
/// the batch.
///
/// # Examples
///
/// ```rust
/// use geotree::{RTreeConfig, TreeVariant};
///
/// let config = RTreeConfig::new(TreeVariant::Star)
///     .with_capacity(4, 10)
///     .with_reinsert_fraction(0.3);
/// assert!(config.validate(2).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTreeConfig {
    /// Minimum number of entries per non-root node (`m`)
    pub min_entries: usize,
    /// Maximum number of entries per node (`M`)
    pub max_entries: usize,
    pub variant: TreeVariant,
    /// Share of entries removed for forced reinsertion (R* only), in `(0, 1)`
    pub reinsert_fraction: f64,
    /// Per-axis tolerance of the EQUALS predicate
    pub equals_tolerance: f64,
    /// Bits per axis of the Hilbert grid
    pub hilbert_order: u32,
    /// Working extent of the Hilbert curve. Falls back to the coordinate
    /// system domain when unset. Required for a Hilbert tree over unbounded
    /// axes.
    pub hilbert_extent: Option<Envelope>,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        RTreeConfig::new(TreeVariant::Basic(SplitAlgorithm::Quadratic))
    }
}

impl RTreeConfig {
    /// Default capacity and tolerances for `variant`.
    pub fn new(variant: TreeVariant) -> Self {
        RTreeConfig {
            min_entries: DEFAULT_MIN_ENTRIES,
            max_entries: DEFAULT_MAX_ENTRIES,
            variant,
            reinsert_fraction: DEFAULT_REINSERT_FRACTION,
            equals_tolerance: DEFAULT_EQUALS_TOLERANCE,
            hilbert_order: DEFAULT_HILBERT_ORDER,
            hilbert_extent: None,
        }
    }

    /// Sets `m` and `M`.
    pub fn with_capacity(mut self, min_entries: usize, max_entries: usize) -> Self {
        self.min_entries = min_entries;
        self.max_entries = max_entries;
        self
    }

    pub fn with_reinsert_fraction(mut self, fraction: f64) -> Self {
        self.reinsert_fraction = fraction;
        self
    }

    pub fn with_equals_tolerance(mut self, tolerance: f64) -> Self {
        self.equals_tolerance = tolerance;
        self
    }

    pub fn with_hilbert_order(mut self, order: u32) -> Self {
        self.hilbert_order = order;
        self
    }

    /// Sets the working extent the Hilbert curve is laid over.
    pub fn with_hilbert_extent(mut self, extent: Envelope) -> Self {
        self.hilbert_extent = Some(extent);
        self
    }

    /// Checks the configuration for a tree of `dimension` axes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `1 <= m <= M/2`, the reinsert
    /// fraction lies in `(0, 1)`, the tolerance is finite and non-negative,
    /// the Hilbert order is positive and any Hilbert extent has `dimension` axes.
    pub fn validate(&self, dimension: usize) -> IndexResult<()> {
        if dimension == 0 {
            return Err(IndexError::InvalidConfiguration(
                "a tree needs at least one axis".into(),
            ));
        }
        if self.max_entries < 2 {
            return Err(IndexError::InvalidConfiguration(format!(
                "max entries must be at least 2, got {}",
                self.max_entries
            )));
        }
        if self.min_entries < 1 || self.min_entries > self.max_entries / 2 {
            return Err(IndexError::InvalidConfiguration(format!(
                "min entries must lie in [1, {}], got {}",
                self.max_entries / 2,
                self.min_entries
            )));
        }
        if !(self.reinsert_fraction > 0.0 && self.reinsert_fraction < 1.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "reinsert fraction must lie in (0, 1), got {}",
                self.reinsert_fraction
            )));
        }
        if !self.equals_tolerance.is_finite() || self.equals_tolerance < 0.0 {
            return Err(IndexError::InvalidConfiguration(format!(
                "equals tolerance must be finite and non-negative, got {}",
                self.equals_tolerance
            )));
        }
        if self.hilbert_order == 0 {
            return Err(IndexError::InvalidConfiguration(
                "hilbert order must be positive".into(),
            ));
        }
        if let Some(extent) = &self.hilbert_extent {
            if extent.dimension() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: extent.dimension(),
                });
            }
        }
        Ok(())
    }
}
