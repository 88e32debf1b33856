//! Cursor family: deterministic traversal over container domains
//!
//! Four variants, all sharing the same core surface (`has_next` /
//! `advance` / `reset` / `slot` plus sample access through an explicitly
//! passed container):
//!
//! - [`RasterCursor`]: sequential row-major scan of the whole domain; no
//!   coordinate bookkeeping, cheapest per step.
//! - [`SeekCursor`]: localizable-by-dimension; arbitrary repositioning via
//!   `set_position`/`step`, optionally with an out-of-bounds policy for
//!   neighborhood overshoot.
//! - [`PlaneCursor`]: plane-by-plane scan exposing the plane index and the
//!   plane-local (x, y).
//! - [`RegionCursor`]: row-major scan restricted to a rectangular
//!   sub-region.
//!
//! # Traversal order
//!
//! Row-major throughout: axis 0 (x) varies fastest, the last axis varies
//! slowest. This matches the layout's axis fold, so the raster scan walks
//! each plane front to back, then the next plane.
//!
//! Every cursor recomputes its storage slot from its position on each
//! `advance`/`set_position` query path; a slot is never cached across
//! repositioning, so a cursor can never read through a stale cell binding.
//!
//! # Example
//!
//! ```
//! use voxgrid_core::access::PlainArray;
//! use voxgrid_core::container::{Container, PlanarContainer};
//!
//! let mut img = PlanarContainer::<PlainArray<u32>>::new(&[3, 2], 1).unwrap();
//! img.set(&[2, 1], 9).unwrap();
//!
//! let mut sum = 0;
//! let mut cur = img.raster_cursor();
//! while cur.has_next() {
//!     cur.advance().unwrap();
//!     sum += cur.get(&img).unwrap();
//! }
//! assert_eq!(sum, 9);
//! ```

use crate::bounds::{OutOfBounds, Substitute};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::layout::{PlanarLayout, Slot};
use crate::scalar::Scalar;

// ============================================================================
// RasterCursor
// ============================================================================

/// Sequential cursor: row-major over the whole domain
///
/// Starts before the first pixel; the first `advance` lands on the origin.
/// Tracks only a linear (cell, offset) pair, no coordinate vector; use
/// [`SeekCursor`] when the traversal needs to report positions.
#[derive(Debug, Clone)]
pub struct RasterCursor {
    plane_len: usize,
    entities_per_pixel: usize,
    total_pixels: usize,
    visited: usize,
    cell: usize,
    offset: usize,
}

impl RasterCursor {
    /// Cursor over a layout's full domain, positioned before the start
    pub fn new(layout: &PlanarLayout) -> Self {
        Self {
            plane_len: layout.plane_len(),
            entities_per_pixel: layout.entities_per_pixel(),
            total_pixels: layout.num_pixels(),
            visited: 0,
            cell: 0,
            offset: 0,
        }
    }

    /// Whether another pixel remains in the scan
    pub fn has_next(&self) -> bool {
        self.visited < self.total_pixels
    }

    /// Move to the next pixel in row-major order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] when every pixel has been visited.
    pub fn advance(&mut self) -> Result<()> {
        if !self.has_next() {
            return Err(Error::Exhausted);
        }
        if self.visited > 0 {
            self.offset += self.entities_per_pixel;
            if self.offset == self.plane_len {
                self.cell += 1;
                self.offset = 0;
            }
        }
        self.visited += 1;
        Ok(())
    }

    /// Return to the before-start state for a fresh pass
    pub fn reset(&mut self) {
        self.visited = 0;
        self.cell = 0;
        self.offset = 0;
    }

    /// Storage slot of the current pixel
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unpositioned`] before the first advance.
    pub fn slot(&self) -> Result<Slot> {
        if self.visited == 0 {
            return Err(Error::Unpositioned);
        }
        Ok(Slot {
            cell: self.cell,
            offset: self.offset,
        })
    }

    /// Read the sample under the cursor
    pub fn get<C: Container>(&self, img: &C) -> Result<C::Elem> {
        img.read(self.slot()?)
    }

    /// Write the sample under the cursor
    pub fn set<C: Container>(&self, img: &mut C, value: C::Elem) -> Result<()> {
        img.write(self.slot()?, value)
    }
}

// ============================================================================
// SeekCursor
// ============================================================================

/// Localizable cursor: sequential advance plus arbitrary repositioning
///
/// Without a policy, every position must be in bounds. With an
/// [`OutOfBounds`] policy attached, any coordinate is legal to visit and
/// read (the policy supplies the substitute), which is what neighborhood
/// scans use when their window overhangs the edge. Writes always require an
/// in-bounds position.
#[derive(Debug, Clone)]
pub struct SeekCursor<T: Scalar> {
    layout: PlanarLayout,
    pos: Vec<i64>,
    positioned: bool,
    bounds: Option<OutOfBounds<T>>,
}

impl<T: Scalar> SeekCursor<T> {
    /// Strict cursor: out-of-bounds positioning is an error
    pub fn new(layout: &PlanarLayout) -> Self {
        Self {
            layout: layout.clone(),
            pos: vec![0; layout.rank()],
            positioned: false,
            bounds: None,
        }
    }

    /// Cursor with an out-of-bounds policy for reads past the edge
    pub fn with_bounds(layout: &PlanarLayout, policy: OutOfBounds<T>) -> Self {
        Self {
            layout: layout.clone(),
            pos: vec![0; layout.rank()],
            positioned: false,
            bounds: Some(policy),
        }
    }

    /// Whether the raster order has another in-bounds position
    ///
    /// False when parked out of bounds: sequential order is only defined
    /// from inside the domain.
    pub fn has_next(&self) -> bool {
        if !self.positioned {
            return true;
        }
        match self.layout.contains(&self.pos) {
            Ok(true) => !self.at_last(),
            _ => false,
        }
    }

    fn at_last(&self) -> bool {
        self.pos
            .iter()
            .zip(self.layout.dims())
            .all(|(&c, &extent)| c == extent as i64 - 1)
    }

    /// Move to the next position in row-major order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] at the end of the domain and
    /// [`Error::CoordOutOfRange`] when called while parked out of bounds.
    pub fn advance(&mut self) -> Result<()> {
        if !self.positioned {
            self.pos.fill(0);
            self.positioned = true;
            return Ok(());
        }

        // Raster order is undefined from an outside position.
        self.layout.resolve(&self.pos)?;

        for axis in 0..self.pos.len() {
            if self.pos[axis] + 1 < self.layout.dims()[axis] as i64 {
                self.pos[axis] += 1;
                for lower in 0..axis {
                    self.pos[lower] = 0;
                }
                return Ok(());
            }
        }
        Err(Error::Exhausted)
    }

    /// Jump to an arbitrary coordinate
    ///
    /// # Errors
    ///
    /// Returns [`Error::RankMismatch`] for a wrong-rank coordinate and,
    /// without a policy, [`Error::CoordOutOfRange`] for an outside one.
    pub fn set_position(&mut self, coord: &[i64]) -> Result<()> {
        self.layout.check_rank(coord.len())?;
        if self.bounds.is_none() {
            self.layout.resolve(coord)?;
        }
        self.pos.copy_from_slice(coord);
        self.positioned = true;
        Ok(())
    }

    /// Move by `delta` along one axis
    ///
    /// Same bounds rules as [`SeekCursor::set_position`].
    pub fn step(&mut self, axis: usize, delta: i64) -> Result<()> {
        if !self.positioned {
            return Err(Error::Unpositioned);
        }
        if axis >= self.pos.len() {
            return Err(Error::AxisOutOfRange {
                axis,
                rank: self.pos.len(),
            });
        }
        let moved = self.pos[axis] + delta;
        if self.bounds.is_none() {
            let extent = self.layout.dims()[axis];
            if moved < 0 || moved as usize >= extent {
                return Err(Error::CoordOutOfRange {
                    axis,
                    coord: moved,
                    extent,
                });
            }
        }
        self.pos[axis] = moved;
        Ok(())
    }

    /// The current coordinate
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unpositioned`] before the first positioning.
    pub fn position(&self) -> Result<&[i64]> {
        if !self.positioned {
            return Err(Error::Unpositioned);
        }
        Ok(&self.pos)
    }

    /// Return to the before-start state for a fresh pass
    pub fn reset(&mut self) {
        self.positioned = false;
    }

    /// Storage slot of the current position
    ///
    /// Recomputed from the coordinate on every call. An outside position
    /// has no slot, policy or not: substitutes are values, not storage.
    pub fn slot(&self) -> Result<Slot> {
        if !self.positioned {
            return Err(Error::Unpositioned);
        }
        self.layout.resolve(&self.pos)
    }

    /// Read the sample at the current position
    ///
    /// In bounds this reads storage; out of bounds with a policy it reads
    /// the policy's substitute (a folded source sample or a constant).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CoordOutOfRange`] when out of bounds without a
    /// policy, [`Error::Unpositioned`] before the first positioning.
    pub fn get<C: Container<Elem = T>>(&self, img: &C) -> Result<T> {
        if !self.positioned {
            return Err(Error::Unpositioned);
        }
        match &self.bounds {
            None => img.read(self.layout.resolve(&self.pos)?),
            Some(policy) => match policy.substitute(&self.layout, &self.pos)? {
                Substitute::Value(value) => Ok(value),
                Substitute::At(coord) => img.read(self.layout.resolve(&coord)?),
            },
        }
    }

    /// Write the sample at the current position
    ///
    /// Requires an in-bounds position regardless of policy.
    pub fn set<C: Container<Elem = T>>(&self, img: &mut C, value: T) -> Result<()> {
        img.write(self.slot()?, value)
    }
}

// ============================================================================
// PlaneCursor
// ============================================================================

/// Planar cursor: walks one 2D plane at a time
///
/// Exposes the plane index and plane-local (x, y) while scanning, and can
/// jump straight to the start of any plane. The in-plane order is row-major
/// (x fastest), so for the planar layout the overall visit order equals the
/// raster scan.
#[derive(Debug, Clone)]
pub struct PlaneCursor {
    width: usize,
    height: usize,
    planes: usize,
    entities_per_pixel: usize,
    plane: usize,
    x: usize,
    y: usize,
    started: bool,
}

impl PlaneCursor {
    /// Cursor over a layout's planes, positioned before the start
    pub fn new(layout: &PlanarLayout) -> Self {
        Self {
            width: layout.width(),
            height: layout.height(),
            planes: layout.planes(),
            entities_per_pixel: layout.entities_per_pixel(),
            plane: 0,
            x: 0,
            y: 0,
            started: false,
        }
    }

    /// Whether another pixel remains in the scan
    pub fn has_next(&self) -> bool {
        if !self.started {
            return true;
        }
        !(self.plane == self.planes - 1 && self.y == self.height - 1 && self.x == self.width - 1)
    }

    /// Move to the next pixel, crossing into the next plane at plane ends
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] after the last pixel of the last plane.
    pub fn advance(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            return Ok(());
        }
        if self.x + 1 < self.width {
            self.x += 1;
            return Ok(());
        }
        if self.y + 1 < self.height {
            self.x = 0;
            self.y += 1;
            return Ok(());
        }
        if self.plane + 1 < self.planes {
            self.x = 0;
            self.y = 0;
            self.plane += 1;
            return Ok(());
        }
        Err(Error::Exhausted)
    }

    /// Jump to the first pixel of plane `plane`
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlaneOutOfRange`] for a bad plane index.
    pub fn seek_plane(&mut self, plane: usize) -> Result<()> {
        if plane >= self.planes {
            return Err(Error::PlaneOutOfRange {
                plane,
                planes: self.planes,
            });
        }
        self.plane = plane;
        self.x = 0;
        self.y = 0;
        self.started = true;
        Ok(())
    }

    /// Index of the plane under the cursor
    pub fn plane_index(&self) -> Result<usize> {
        if !self.started {
            return Err(Error::Unpositioned);
        }
        Ok(self.plane)
    }

    /// Plane-local (x, y) of the current pixel
    pub fn local_position(&self) -> Result<(i64, i64)> {
        if !self.started {
            return Err(Error::Unpositioned);
        }
        Ok((self.x as i64, self.y as i64))
    }

    /// Return to the before-start state for a fresh pass
    pub fn reset(&mut self) {
        self.started = false;
        self.plane = 0;
        self.x = 0;
        self.y = 0;
    }

    /// Storage slot of the current pixel
    pub fn slot(&self) -> Result<Slot> {
        if !self.started {
            return Err(Error::Unpositioned);
        }
        Ok(Slot {
            cell: self.plane,
            offset: (self.y * self.width + self.x) * self.entities_per_pixel,
        })
    }

    /// Read the sample under the cursor
    pub fn get<C: Container>(&self, img: &C) -> Result<C::Elem> {
        img.read(self.slot()?)
    }

    /// Write the sample under the cursor
    pub fn set<C: Container>(&self, img: &mut C, value: C::Elem) -> Result<()> {
        img.write(self.slot()?, value)
    }
}

// ============================================================================
// RegionCursor
// ============================================================================

/// Region-of-interest cursor: row-major within a rectangular sub-region
///
/// Bounded at construction to `origin + size` per axis; visits exactly the
/// sub-region's pixels, reports the absolute coordinate, and is restartable
/// with [`RegionCursor::reset`].
#[derive(Debug, Clone)]
pub struct RegionCursor {
    layout: PlanarLayout,
    origin: Vec<i64>,
    size: Vec<usize>,
    /// Position relative to the region origin
    rel: Vec<usize>,
    /// Absolute coordinate, kept in step with `rel`
    abs: Vec<i64>,
    visited: usize,
    total: usize,
}

impl RegionCursor {
    /// Cursor over the sub-region `[origin, origin + size)` of a layout
    ///
    /// # Errors
    ///
    /// Returns [`Error::RankMismatch`] when origin or size rank disagrees
    /// with the layout, [`Error::InvalidDimensions`] for a zero-sized axis,
    /// and [`Error::CoordOutOfRange`] when the region overhangs the bounds.
    pub fn new(layout: &PlanarLayout, origin: &[i64], size: &[usize]) -> Result<Self> {
        layout.check_rank(origin.len())?;
        layout.check_rank(size.len())?;
        if size.iter().any(|&s| s == 0) {
            return Err(Error::InvalidDimensions { dims: size.to_vec() });
        }
        for (axis, ((&o, &s), &extent)) in origin.iter().zip(size).zip(layout.dims()).enumerate() {
            if o < 0 {
                return Err(Error::CoordOutOfRange {
                    axis,
                    coord: o,
                    extent,
                });
            }
            let last = o + s as i64 - 1;
            if last as usize >= extent {
                return Err(Error::CoordOutOfRange {
                    axis,
                    coord: last,
                    extent,
                });
            }
        }

        Ok(Self {
            layout: layout.clone(),
            origin: origin.to_vec(),
            size: size.to_vec(),
            rel: vec![0; origin.len()],
            abs: origin.to_vec(),
            visited: 0,
            total: size.iter().product(),
        })
    }

    /// Whether another pixel remains in the sub-region
    pub fn has_next(&self) -> bool {
        self.visited < self.total
    }

    /// Move to the next pixel of the sub-region in row-major order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] once the whole sub-region is visited.
    pub fn advance(&mut self) -> Result<()> {
        if !self.has_next() {
            return Err(Error::Exhausted);
        }
        if self.visited > 0 {
            for axis in 0..self.rel.len() {
                if self.rel[axis] + 1 < self.size[axis] {
                    self.rel[axis] += 1;
                    self.abs[axis] += 1;
                    for lower in 0..axis {
                        self.rel[lower] = 0;
                        self.abs[lower] = self.origin[lower];
                    }
                    break;
                }
            }
        }
        self.visited += 1;
        Ok(())
    }

    /// The absolute coordinate of the current pixel
    pub fn position(&self) -> Result<&[i64]> {
        if self.visited == 0 {
            return Err(Error::Unpositioned);
        }
        Ok(&self.abs)
    }

    /// Return to the region start for a fresh pass
    pub fn reset(&mut self) {
        self.visited = 0;
        self.rel.fill(0);
        self.abs.copy_from_slice(&self.origin);
    }

    /// Storage slot of the current pixel, recomputed from the coordinate
    pub fn slot(&self) -> Result<Slot> {
        if self.visited == 0 {
            return Err(Error::Unpositioned);
        }
        self.layout.resolve(&self.abs)
    }

    /// Read the sample under the cursor
    pub fn get<C: Container>(&self, img: &C) -> Result<C::Elem> {
        img.read(self.slot()?)
    }

    /// Write the sample under the cursor
    pub fn set<C: Container>(&self, img: &mut C, value: C::Elem) -> Result<()> {
        img.write(self.slot()?, value)
    }
}
