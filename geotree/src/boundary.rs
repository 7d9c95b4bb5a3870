use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::coordinate_system::CoordinateSystem;
use crate::rtree::rtree_types::{IndexError, IndexResult};

/// Per-axis `(min, max)` storage; four axes fit inline (x, y, z, t).
pub type AxisRanges = SmallVec<[(f64, f64); 4]>;

/// Center or query point coordinates.
pub type Coordinates = SmallVec<[f64; 4]>;

/// An n-dimensional axis-aligned box without a coordinate system.
///
/// This is the representation stored inside tree nodes. It is a value type:
/// the tree never mutates the envelope of a node in place once published,
/// it computes a new one and replaces the old.
///
/// An envelope whose `min > max` on some axis is *empty*. The empty envelope
/// of a given dimension ([`Envelope::empty`]) is the identity of
/// [`Envelope::union`] and has zero volume.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Envelope {
    ranges: AxisRanges,
}

impl Eq for Envelope {}

impl Hash for Envelope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (min, max) in &self.ranges {
            min.to_bits().hash(state);
            max.to_bits().hash(state);
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (min, max)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "[{}, {}]", min, max)?;
        }
        Ok(())
    }
}

impl Envelope {
    /// Builds an envelope from `(min, max)` pairs, one per axis.
    pub fn from_ranges(ranges: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Envelope {
            ranges: ranges.into_iter().collect(),
        }
    }

    /// A degenerate envelope covering a single point.
    pub fn from_point(point: &[f64]) -> Self {
        Envelope::from_ranges(point.iter().map(|&c| (c, c)))
    }

    /// The empty envelope of the given dimension.
    pub fn empty(dimension: usize) -> Self {
        Envelope::from_ranges((0..dimension).map(|_| (f64::INFINITY, f64::NEG_INFINITY)))
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.ranges.len()
    }

    /// All `(min, max)` pairs.
    pub fn ranges(&self) -> &[(f64, f64)] {
        &self.ranges
    }

    /// The `(min, max)` pair of `axis`.
    pub fn range(&self, axis: usize) -> (f64, f64) {
        self.ranges[axis]
    }

    /// Lower bound along `axis`.
    pub fn min(&self, axis: usize) -> f64 {
        self.ranges[axis].0
    }

    /// Upper bound along `axis`.
    pub fn max(&self, axis: usize) -> f64 {
        self.ranges[axis].1
    }

    /// True if `min > max` along any axis.
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().any(|(min, max)| min > max)
    }

    /// True if every axis has zero extent.
    pub fn is_point(&self) -> bool {
        self.ranges.iter().all(|(min, max)| min == max)
    }

    /// Length of the envelope along `axis` (zero for an empty envelope).
    pub fn extent(&self, axis: usize) -> f64 {
        let (min, max) = self.ranges[axis];
        (max - min).max(0.0)
    }

    /// The center point.
    pub fn center(&self) -> Coordinates {
        self.ranges
            .iter()
            .map(|(min, max)| (min + max) / 2.0)
            .collect()
    }

    /// Product of the extents; zero for empty and degenerate envelopes.
    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.ranges.iter().map(|(min, max)| max - min).product()
    }

    /// Sum of the extents. This is the "margin" the R*-tree split minimizes;
    /// it is proportional to the perimeter in 2D and the surface in 3D.
    pub fn margin(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.ranges.iter().map(|(min, max)| max - min).sum()
    }

    /// Smallest envelope containing both `self` and `other`.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope::from_ranges(
            self.ranges
                .iter()
                .zip(other.ranges.iter())
                .map(|(a, b)| (a.0.min(b.0), a.1.max(b.1))),
        )
    }

    /// Grows `self` to contain `other`.
    pub fn expand(&mut self, other: &Envelope) {
        for (a, b) in self.ranges.iter_mut().zip(other.ranges.iter()) {
            a.0 = a.0.min(b.0);
            a.1 = a.1.max(b.1);
        }
    }

    /// True if the closed boxes share at least one point. Touching boxes intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.ranges
            .iter()
            .zip(other.ranges.iter())
            .all(|(a, b)| a.0 <= b.1 && a.1 >= b.0)
    }

    /// True if `other` lies inside `self` (boundaries inclusive).
    pub fn contains(&self, other: &Envelope) -> bool {
        self.ranges
            .iter()
            .zip(other.ranges.iter())
            .all(|(a, b)| a.0 <= b.0 && a.1 >= b.1)
    }

    /// True if `point` lies inside `self` (boundaries inclusive).
    pub fn contains_point(&self, point: &[f64]) -> bool {
        self.ranges
            .iter()
            .zip(point.iter())
            .all(|((min, max), c)| *min <= *c && *c <= *max)
    }

    /// The common part of both envelopes, if they intersect.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        if !self.intersects(other) {
            return None;
        }
        Some(Envelope::from_ranges(
            self.ranges
                .iter()
                .zip(other.ranges.iter())
                .map(|(a, b)| (a.0.max(b.0), a.1.min(b.1))),
        ))
    }

    /// Length of the shared interval along `axis`, zero if the intervals
    /// only touch or are disjoint.
    pub fn overlap_extent(&self, other: &Envelope, axis: usize) -> f64 {
        let (a_min, a_max) = self.ranges[axis];
        let (b_min, b_max) = other.ranges[axis];
        (a_max.min(b_max) - a_min.max(b_min)).max(0.0)
    }

    /// Volume of the intersection, zero if the envelopes are disjoint.
    pub fn overlap(&self, other: &Envelope) -> f64 {
        if !self.intersects(other) {
            return 0.0;
        }
        (0..self.dimension())
            .map(|axis| self.overlap_extent(other, axis))
            .product()
    }

    /// Volume growth needed for `self` to also cover `other`.
    pub fn enlargement(&self, other: &Envelope) -> f64 {
        self.union(other).volume() - self.volume()
    }

    /// Axis-wise equality within `tolerance`.
    pub fn approx_eq(&self, other: &Envelope, tolerance: f64) -> bool {
        self.dimension() == other.dimension()
            && self
                .ranges
                .iter()
                .zip(other.ranges.iter())
                .all(|(a, b)| (a.0 - b.0).abs() <= tolerance && (a.1 - b.1).abs() <= tolerance)
    }

    /// Euclidean distance from `point` to the closest point of the envelope;
    /// zero when the point is inside.
    pub fn min_distance(&self, point: &[f64]) -> f64 {
        self.ranges
            .iter()
            .zip(point.iter())
            .map(|(&(min, max), &c)| {
                let d = c - c.clamp(min, max);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Squared distance between the centers of two envelopes.
    pub fn center_distance_sq(&self, other: &Envelope) -> f64 {
        self.ranges
            .iter()
            .zip(other.ranges.iter())
            .map(|(a, b)| {
                let d = (a.0 + a.1) / 2.0 - (b.0 + b.1) / 2.0;
                d * d
            })
            .sum()
    }
}

/// An n-dimensional bounding box tied to a coordinate system.
///
/// `Boundary` is the public, validated form of an [`Envelope`]: it can only
/// be built with as many `(min, max)` pairs as the coordinate system has
/// axes, with finite values and `min <= max` on every axis.
///
/// # Examples
///
/// ```rust
/// use geotree::{Boundary, CoordinateSystem};
///
/// let crs = CoordinateSystem::cartesian(2).shared();
/// let a = Boundary::new(crs.clone(), [(0.0, 10.0), (0.0, 10.0)]).unwrap();
/// let b = Boundary::new(crs, [(5.0, 15.0), (5.0, 15.0)]).unwrap();
///
/// assert!(a.intersects(&b).unwrap());
/// assert_eq!(a.overlap(&b).unwrap(), 25.0);
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct Boundary {
    crs: Arc<CoordinateSystem>,
    envelope: Envelope,
}

impl Hash for Boundary {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.crs.name().hash(state);
        self.envelope.hash(state);
    }
}

impl Eq for Boundary {}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Boundary({}: {})", self.crs.name(), self.envelope)
    }
}

impl Boundary {
    /// Creates a boundary from one `(min, max)` pair per axis of `crs`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the number of pairs differs from the axis count,
    /// `InvalidBoundary` for non-finite values or `min > max`.
    pub fn new(
        crs: Arc<CoordinateSystem>,
        ranges: impl IntoIterator<Item = (f64, f64)>,
    ) -> IndexResult<Boundary> {
        Boundary::from_envelope(crs, Envelope::from_ranges(ranges))
    }

    /// A degenerate boundary covering a single point.
    pub fn point(crs: Arc<CoordinateSystem>, coordinates: &[f64]) -> IndexResult<Boundary> {
        Boundary::from_envelope(crs, Envelope::from_point(coordinates))
    }

    /// Creates a boundary from its lower and upper corners.
    pub fn from_corners(
        crs: Arc<CoordinateSystem>,
        lower: &[f64],
        upper: &[f64],
    ) -> IndexResult<Boundary> {
        if lower.len() != upper.len() {
            return Err(IndexError::DimensionMismatch {
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        Boundary::new(crs, lower.iter().copied().zip(upper.iter().copied()))
    }

    /// Validates `envelope` against `crs` and wraps it.
    pub fn from_envelope(crs: Arc<CoordinateSystem>, envelope: Envelope) -> IndexResult<Boundary> {
        if envelope.dimension() != crs.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: crs.dimension(),
                actual: envelope.dimension(),
            });
        }
        for (axis, (min, max)) in envelope.ranges().iter().enumerate() {
            if !min.is_finite() || !max.is_finite() {
                return Err(IndexError::InvalidBoundary(format!(
                    "non-finite coordinate on axis {}",
                    axis
                )));
            }
            if min > max {
                return Err(IndexError::InvalidBoundary(format!(
                    "min {} is greater than max {} on axis {}",
                    min, max, axis
                )));
            }
        }
        Ok(Boundary { crs, envelope })
    }

    /// Wraps an envelope produced by the tree itself (node unions), which may
    /// be the empty envelope of an empty root.
    pub(crate) fn from_trusted(crs: Arc<CoordinateSystem>, envelope: Envelope) -> Boundary {
        Boundary { crs, envelope }
    }

    /// The coordinate system identity.
    pub fn coordinate_system(&self) -> &Arc<CoordinateSystem> {
        &self.crs
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.envelope.dimension()
    }

    /// The underlying envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Consumes the boundary, returning its envelope.
    pub fn into_envelope(self) -> Envelope {
        self.envelope
    }

    /// Lower bound along `axis`.
    pub fn min(&self, axis: usize) -> f64 {
        self.envelope.min(axis)
    }

    /// Upper bound along `axis`.
    pub fn max(&self, axis: usize) -> f64 {
        self.envelope.max(axis)
    }

    /// Product of the extents.
    pub fn volume(&self) -> f64 {
        self.envelope.volume()
    }

    /// Fails unless `other` uses the same coordinate system.
    pub fn check_compatible(&self, other: &Boundary) -> IndexResult<()> {
        same_coordinate_system(&self.crs, &other.crs)
    }

    /// Smallest boundary containing both.
    pub fn union(&self, other: &Boundary) -> IndexResult<Boundary> {
        self.check_compatible(other)?;
        Ok(Boundary::from_trusted(
            self.crs.clone(),
            self.envelope.union(&other.envelope),
        ))
    }

    /// True if the boxes share at least one point.
    pub fn intersects(&self, other: &Boundary) -> IndexResult<bool> {
        self.check_compatible(other)?;
        Ok(self.envelope.intersects(&other.envelope))
    }

    /// True if `other` lies inside `self`.
    pub fn contains(&self, other: &Boundary) -> IndexResult<bool> {
        self.check_compatible(other)?;
        Ok(self.envelope.contains(&other.envelope))
    }

    /// Volume growth needed for `self` to also cover `other`.
    pub fn enlargement(&self, other: &Boundary) -> IndexResult<f64> {
        self.check_compatible(other)?;
        Ok(self.envelope.enlargement(&other.envelope))
    }

    /// Volume of the intersection, zero if disjoint.
    pub fn overlap(&self, other: &Boundary) -> IndexResult<f64> {
        self.check_compatible(other)?;
        Ok(self.envelope.overlap(&other.envelope))
    }
}

/// Coordinate systems match when they are the same instance or equal values.
pub(crate) fn same_coordinate_system(
    a: &Arc<CoordinateSystem>,
    b: &Arc<CoordinateSystem>,
) -> IndexResult<()> {
    if Arc::ptr_eq(a, b) || a == b {
        Ok(())
    } else {
        Err(IndexError::CoordinateSystemMismatch {
            expected: a.name().to_string(),
            actual: b.name().to_string(),
        })
    }
}
