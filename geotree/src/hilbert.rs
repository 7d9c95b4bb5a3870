//! Hilbert curve utilities for the Hilbert R-tree and bulk loading.
//!
//! The Hilbert curve is a continuous space-filling curve that maps
//! n-dimensional grid cells to a single ordering value while preserving
//! spatial locality: cells that are close along the curve are close in space.
//!
//! ## Quantization
//! Coordinates are normalized into a working extent and quantized onto a grid
//! of `2^order` cells per axis. The rank is packed into a `u64`, so
//! `order * dimension` is capped at 64 bits; higher dimensions get a coarser
//! effective order.

use crate::boundary::Envelope;
use crate::rtree::rtree_types::{IndexError, IndexResult};

/// Maximum number of bits in a packed Hilbert rank.
const MAX_RANK_BITS: u32 = 64;

/// Computes the Hilbert rank of grid cell `cell` on a curve of the given
/// `order` (bits per axis).
///
/// Uses Skilling's transpose algorithm ("Programming the Hilbert curve",
/// 2004): the axes are converted to the transposed Hilbert form in place and
/// the transposed bits are then interleaved, most significant bit first.
///
/// # Example
/// ```
/// use geotree::hilbert::hilbert_index;
///
/// // The 2x2 curve visits (0,0), (0,1), (1,1), (1,0).
/// assert_eq!(hilbert_index(&[0, 0], 1), 0);
/// assert_eq!(hilbert_index(&[0, 1], 1), 1);
/// assert_eq!(hilbert_index(&[1, 1], 1), 2);
/// assert_eq!(hilbert_index(&[1, 0], 1), 3);
/// ```
pub fn hilbert_index(cell: &[u64], order: u32) -> u64 {
    debug_assert!(order > 0, "order must be positive");
    debug_assert!(
        order as usize * cell.len() <= MAX_RANK_BITS as usize,
        "rank does not fit in 64 bits"
    );

    let n = cell.len();
    if n == 0 {
        return 0;
    }
    if n == 1 {
        return cell[0];
    }

    let mut x: smallvec::SmallVec<[u64; 4]> = cell.iter().copied().collect();
    let m = 1u64 << (order - 1);

    // inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // gray encode
    for i in 1..n {
        x[i] ^= x[i - 1];
    }
    let mut t = 0u64;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for v in x.iter_mut() {
        *v ^= t;
    }

    let mut rank = 0u64;
    for bit in (0..order).rev() {
        for v in x.iter() {
            rank = (rank << 1) | ((v >> bit) & 1);
        }
    }
    rank
}

/// A Hilbert curve laid over a working extent.
#[derive(Debug, Clone, PartialEq)]
pub struct HilbertCurve {
    extent: Envelope,
    order: u32,
}

impl HilbertCurve {
    /// Creates a curve over `extent` with `order` bits per axis.
    ///
    /// The effective order is reduced so that the packed rank fits in 64 bits.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `order` is zero, the extent is empty or has
    /// no axes, or the dimension exceeds 64.
    pub fn new(extent: Envelope, order: u32) -> IndexResult<Self> {
        let dimension = extent.dimension();
        if order == 0 {
            return Err(IndexError::InvalidConfiguration(
                "hilbert order must be positive".into(),
            ));
        }
        if dimension == 0 || dimension > MAX_RANK_BITS as usize {
            return Err(IndexError::InvalidConfiguration(format!(
                "hilbert curve cannot cover {} axes",
                dimension
            )));
        }
        if extent.is_empty() {
            return Err(IndexError::InvalidConfiguration(
                "hilbert extent is empty".into(),
            ));
        }
        let order = order.min(MAX_RANK_BITS / dimension as u32);
        Ok(HilbertCurve { extent, order })
    }

    /// The working extent.
    pub fn extent(&self) -> &Envelope {
        &self.extent
    }

    /// Effective bits per axis.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Rank of a point. Coordinates outside the extent are clamped onto it;
    /// an axis of zero width maps to its middle cell.
    pub fn rank_point(&self, point: &[f64]) -> u64 {
        let cells = 1u64 << self.order;
        let cell: smallvec::SmallVec<[u64; 4]> = point
            .iter()
            .enumerate()
            .map(|(axis, &c)| {
                let (min, max) = self.extent.range(axis);
                let range = max - min;
                let norm = if range > 0.0 {
                    ((c - min) / range).clamp(0.0, 1.0)
                } else {
                    0.5
                };
                ((norm * cells as f64) as u64).min(cells - 1)
            })
            .collect();
        hilbert_index(&cell, self.order)
    }

    /// Rank of the center of `envelope`.
    pub fn rank_of(&self, envelope: &Envelope) -> u64 {
        self.rank_point(&envelope.center())
    }
}
