//! Out-of-bounds policies for neighborhood access
//!
//! Neighborhood algorithms (convolution, cross-correlation, morphology) scan
//! windows that overhang the container edge. An [`OutOfBounds`] policy turns
//! such a coordinate into a substitute: either a constant fill value or a
//! folded in-bounds source coordinate. Folding is a pure function of the
//! policy, the bounds, and the coordinate; the container is never touched.
//!
//! A seek cursor without a policy treats out-of-bounds positioning as an
//! error; attaching a policy makes any coordinate legal for reads. Writes
//! through an out-of-bounds position are always rejected.

use crate::error::Result;
use crate::layout::PlanarLayout;
use crate::scalar::Scalar;

/// Substitute for reading at an out-of-bounds coordinate
#[derive(Debug, Clone, PartialEq)]
pub enum Substitute<T> {
    /// Read resolves to this value directly, no storage access
    Value(T),
    /// Read resolves to the sample at this in-bounds coordinate
    At(Vec<i64>),
}

/// Policy supplying substitute sources for coordinates outside the bounds
#[derive(Debug, Clone, PartialEq)]
pub enum OutOfBounds<T: Scalar> {
    /// Every outside coordinate reads as this value
    Constant(T),
    /// Components fold to the nearest edge
    Clamp,
    /// Components wrap around the axis extent
    Periodic,
    /// Components reflect across the boundary; the edge sample is not
    /// repeated (period `2·(extent-1)`), and an axis of extent 1 always
    /// folds to 0
    Mirror,
}

impl<T: Scalar> OutOfBounds<T> {
    /// Map a coordinate to its read substitute under this policy
    ///
    /// Total over all coordinates: an in-bounds coordinate folds to itself
    /// under every policy. Per-axis folding:
    ///
    /// ```text
    /// extent 4:   index  -3 -2 -1 | 0 1 2 3 | 4 5 6
    /// Clamp              0  0  0 | 0 1 2 3 | 3 3 3
    /// Periodic           1  2  3 | 0 1 2 3 | 0 1 2
    /// Mirror             3  2  1 | 0 1 2 3 | 2 1 0
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::RankMismatch`] when the coordinate's
    /// rank disagrees with the layout.
    pub fn substitute(&self, layout: &PlanarLayout, coord: &[i64]) -> Result<Substitute<T>> {
        if layout.contains(coord)? {
            return Ok(Substitute::At(coord.to_vec()));
        }

        match self {
            OutOfBounds::Constant(value) => Ok(Substitute::Value(*value)),
            OutOfBounds::Clamp => Ok(Substitute::At(fold_each(coord, layout.dims(), clamp_axis))),
            OutOfBounds::Periodic => Ok(Substitute::At(fold_each(coord, layout.dims(), periodic_axis))),
            OutOfBounds::Mirror => Ok(Substitute::At(fold_each(coord, layout.dims(), mirror_axis))),
        }
    }
}

fn fold_each(coord: &[i64], dims: &[usize], fold: fn(i64, usize) -> i64) -> Vec<i64> {
    coord
        .iter()
        .zip(dims)
        .map(|(&c, &extent)| fold(c, extent))
        .collect()
}

/// Fold one component to the nearest edge of its axis
pub fn clamp_axis(c: i64, extent: usize) -> i64 {
    c.clamp(0, extent as i64 - 1)
}

/// Wrap one component around its axis extent
pub fn periodic_axis(c: i64, extent: usize) -> i64 {
    let n = extent as i64;
    ((c % n) + n) % n
}

/// Reflect one component across its axis boundary without repeating the edge
pub fn mirror_axis(c: i64, extent: usize) -> i64 {
    if extent == 1 {
        return 0;
    }
    let period = 2 * (extent as i64 - 1);
    let m = ((c % period) + period) % period;
    if m >= extent as i64 {
        period - m
    } else {
        m
    }
}
