//! Constants for the R-tree family.

/// Default maximum number of entries (or children) per node (`M`)
pub const DEFAULT_MAX_ENTRIES: usize = 16;

/// Default minimum number of entries per non-root node (`m`, 40% of `M`)
pub const DEFAULT_MIN_ENTRIES: usize = 6;

/// Share of an overflowing node's entries removed for forced reinsertion (R*-tree)
pub const DEFAULT_REINSERT_FRACTION: f64 = 0.3;

/// Bits per axis of the Hilbert grid (`2^16` cells per axis)
pub const DEFAULT_HILBERT_ORDER: u32 = 16;

/// Default per-axis tolerance of the EQUALS predicate
pub const DEFAULT_EQUALS_TOLERANCE: f64 = 1e-9;
