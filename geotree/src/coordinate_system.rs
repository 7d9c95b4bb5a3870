//! Coordinate system identity for indexed boundaries.
//!
//! The index never transforms coordinates. A coordinate system is only an
//! identity (name + ordered axes) that every boundary carries, so that the
//! tree can reject boundaries expressed in a different system and can size
//! its envelopes from the axis count. Compound systems (for example a 2D
//! geographic system followed by a time axis) are built by concatenating the
//! axes of their components.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::boundary::Envelope;

/// The nature of a coordinate system axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisKind {
    /// A spatial axis (easting, northing, height, longitude, ...).
    Spatial,
    /// A temporal axis.
    Temporal,
}

/// A single axis of a coordinate system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis name, e.g. "x", "longitude" or "time".
    pub name: String,
    /// Spatial or temporal.
    pub kind: AxisKind,
    /// Valid coordinate range along the axis, if the axis is bounded.
    pub domain: Option<(f64, f64)>,
}

impl Axis {
    /// Creates an unbounded spatial axis.
    pub fn spatial(name: impl Into<String>) -> Self {
        Axis {
            name: name.into(),
            kind: AxisKind::Spatial,
            domain: None,
        }
    }

    /// Creates an unbounded temporal axis.
    pub fn temporal(name: impl Into<String>) -> Self {
        Axis {
            name: name.into(),
            kind: AxisKind::Temporal,
            domain: None,
        }
    }

    /// Restricts the axis to `[min, max]`.
    pub fn with_domain(mut self, min: f64, max: f64) -> Self {
        self.domain = Some((min, max));
        self
    }
}

/// An opaque coordinate system identity: a name and an ordered list of axes.
///
/// Two coordinate systems are the same if their names and axes are equal.
/// Boundaries share their coordinate system through an `Arc`, see
/// [`CoordinateSystem::shared`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    name: String,
    axes: Vec<Axis>,
}

impl CoordinateSystem {
    /// Creates a coordinate system from its name and axes.
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Self {
        CoordinateSystem {
            name: name.into(),
            axes,
        }
    }

    /// An unbounded cartesian system with `dimension` spatial axes named
    /// `x`, `y`, `z`, then `x3`, `x4`, ...
    pub fn cartesian(dimension: usize) -> Self {
        let axes = (0..dimension)
            .map(|i| match i {
                0 => Axis::spatial("x"),
                1 => Axis::spatial("y"),
                2 => Axis::spatial("z"),
                n => Axis::spatial(format!("x{}", n)),
            })
            .collect();
        CoordinateSystem::new(format!("Cartesian {}D", dimension), axes)
    }

    /// Geographic longitude/latitude in degrees.
    pub fn geographic_2d() -> Self {
        CoordinateSystem::new(
            "Geographic 2D",
            vec![
                Axis::spatial("longitude").with_domain(-180.0, 180.0),
                Axis::spatial("latitude").with_domain(-90.0, 90.0),
            ],
        )
    }

    /// A single unbounded time axis.
    pub fn temporal() -> Self {
        CoordinateSystem::new("Temporal", vec![Axis::temporal("time")])
    }

    /// Concatenates the axes of `components`, in order.
    pub fn compound(components: &[&CoordinateSystem]) -> Self {
        let name = components
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        let axes = components
            .iter()
            .flat_map(|c| c.axes.iter().cloned())
            .collect();
        CoordinateSystem::new(name, axes)
    }

    /// Wraps this coordinate system in an `Arc` for sharing among boundaries.
    pub fn shared(self) -> Arc<CoordinateSystem> {
        Arc::new(self)
    }

    /// The coordinate system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of axes.
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// All axes, in order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// The axis at `index`, if any.
    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    /// True if at least one axis is temporal.
    pub fn is_spatio_temporal(&self) -> bool {
        self.axes.iter().any(|a| a.kind == AxisKind::Temporal)
    }

    /// The envelope spanned by the axis domains, only when every axis is bounded.
    pub fn domain_envelope(&self) -> Option<Envelope> {
        let mut ranges = Vec::with_capacity(self.axes.len());
        for axis in &self.axes {
            let (min, max) = axis.domain?;
            ranges.push((min, max));
        }
        Some(Envelope::from_ranges(ranges))
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.name)?;
        for (i, axis) in self.axes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axis.name)?;
        }
        write!(f, "]")
    }
}
