//! Planar cell layout: coordinate to (cell, offset) resolution
//!
//! A container partitions its N-dimensional domain into cells. In the planar
//! layout every cell is one `width × height` 2D plane; a rank-1 or rank-2
//! domain degenerates to a single plane. All axes beyond the first two fold
//! into the plane index.
//!
//! # Address format
//!
//! ```text
//! Slot {
//!     cell:   usize,  // plane index: axes >= 2 folded, axis 2 fastest
//!     offset: usize,  // (y * width + x) * entities_per_pixel
//! }
//! ```
//!
//! # Axis fold
//!
//! Axes are ordered x, y, then higher axes (conventionally z, t, c). The
//! plane index is the mixed-radix code of the higher axes with axis 2
//! varying fastest:
//!
//! ```text
//! cell = c[2] + c[3]·dims[2] + c[4]·dims[2]·dims[3] + …
//! ```
//!
//! so a five-axis image has `cell = z + depth·t + depth·frames·c`. The same
//! order is used everywhere: containers, every cursor, and the legacy
//! plane-stack adapter.
//!
//! # Example
//!
//! ```
//! use voxgrid_core::layout::PlanarLayout;
//!
//! let layout = PlanarLayout::new(&[4, 3, 2], 1).unwrap();
//! let slot = layout.resolve(&[1, 2, 1]).unwrap();
//! assert_eq!(slot.cell, 1);
//! assert_eq!(slot.offset, 2 * 4 + 1);
//! assert_eq!(layout.coordinate_of(slot).unwrap(), vec![1, 2, 1]);
//! ```

use crate::error::{Error, Result};

/// Storage address of one pixel: cell index plus intra-cell offset
///
/// The offset is in entity units and addresses the pixel's first entity;
/// with `entities_per_pixel > 1` the remaining entities follow contiguously.
/// `Slot` is the reusable value-view handle cursors hand out: plain data,
/// freely copyable, meaningful only for the container it was resolved
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Cell (plane) index within the container
    pub cell: usize,
    /// Entity offset within the cell's backing array
    pub offset: usize,
}

impl Slot {
    /// Address of entity `k` of this pixel
    ///
    /// Entity 0 is the slot itself. No bounds check happens here; reads and
    /// writes through the container validate the final offset.
    pub fn entity(self, k: usize) -> Slot {
        Slot {
            cell: self.cell,
            offset: self.offset + k,
        }
    }
}

/// Fixed cell geometry of a planar container
///
/// Immutable once constructed; every container holds one and all cursors
/// copy it. Resolution is a pure function: the same coordinate always maps
/// to the same [`Slot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarLayout {
    dims: Vec<usize>,
    entities_per_pixel: usize,
    /// Mixed-radix strides of axes >= 2 into the plane index
    plane_strides: Vec<usize>,
    planes: usize,
    plane_len: usize,
}

impl PlanarLayout {
    /// Build a layout over a dimension vector
    ///
    /// # Arguments
    ///
    /// * `dims` - one positive extent per axis, at least one axis
    /// * `entities_per_pixel` - adjacent primitive slots per coordinate (>= 1),
    ///   e.g. 2 for interleaved complex pairs
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for an empty vector or a zero
    /// extent, [`Error::InvalidEntitiesPerPixel`] for a zero entity count.
    pub fn new(dims: &[usize], entities_per_pixel: usize) -> Result<Self> {
        if dims.is_empty() || dims.iter().any(|&d| d == 0) {
            return Err(Error::InvalidDimensions { dims: dims.to_vec() });
        }
        if entities_per_pixel == 0 {
            return Err(Error::InvalidEntitiesPerPixel);
        }

        let mut plane_strides = Vec::with_capacity(dims.len().saturating_sub(2));
        let mut planes = 1usize;
        for &extent in &dims[2.min(dims.len())..] {
            plane_strides.push(planes);
            planes *= extent;
        }

        let plane_len = dims[0] * dims.get(1).copied().unwrap_or(1) * entities_per_pixel;

        Ok(Self {
            dims: dims.to_vec(),
            entities_per_pixel,
            plane_strides,
            planes,
            plane_len,
        })
    }

    /// The dimension vector
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Adjacent primitive slots per coordinate
    pub fn entities_per_pixel(&self) -> usize {
        self.entities_per_pixel
    }

    /// Extent of axis 0
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    /// Extent of axis 1, or 1 when absent
    pub fn height(&self) -> usize {
        self.axis_or_one(1)
    }

    /// Extent of axis 2, or 1 when absent
    pub fn depth(&self) -> usize {
        self.axis_or_one(2)
    }

    /// Extent of axis 3, or 1 when absent
    pub fn frames(&self) -> usize {
        self.axis_or_one(3)
    }

    /// Extent of axis 4, or 1 when absent
    pub fn channels(&self) -> usize {
        self.axis_or_one(4)
    }

    fn axis_or_one(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    /// Number of cells (2D planes) in the layout
    pub fn planes(&self) -> usize {
        self.planes
    }

    /// Backing-array length of one cell, in entity units
    pub fn plane_len(&self) -> usize {
        self.plane_len
    }

    /// Total number of pixels in the domain
    pub fn num_pixels(&self) -> usize {
        self.dims.iter().product()
    }

    /// Total number of primitive entities in the domain
    pub fn num_entities(&self) -> usize {
        self.num_pixels() * self.entities_per_pixel
    }

    /// Verify a coordinate has the layout's rank
    pub fn check_rank(&self, got: usize) -> Result<()> {
        if got != self.dims.len() {
            return Err(Error::RankMismatch {
                expected: self.dims.len(),
                got,
            });
        }
        Ok(())
    }

    /// Whether `coord` lies inside the bounds on every axis
    ///
    /// # Errors
    ///
    /// Returns [`Error::RankMismatch`] when the coordinate has the wrong
    /// number of components; out-of-bounds itself is an answer, not an
    /// error.
    pub fn contains(&self, coord: &[i64]) -> Result<bool> {
        self.check_rank(coord.len())?;
        Ok(coord
            .iter()
            .zip(&self.dims)
            .all(|(&c, &extent)| c >= 0 && (c as usize) < extent))
    }

    /// Resolve an in-bounds coordinate to its storage slot
    ///
    /// Pure and total over all in-bounds coordinates: the same coordinate
    /// always resolves to the same (cell, offset) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RankMismatch`] for a wrong-rank coordinate and
    /// [`Error::CoordOutOfRange`] for any component outside its axis
    /// extent. Out-of-range components are a programmer error here; legal
    /// neighborhood overshoot goes through an out-of-bounds policy instead.
    ///
    /// # Example
    ///
    /// ```
    /// use voxgrid_core::layout::PlanarLayout;
    ///
    /// // Interleaved pairs: two entities per pixel
    /// let layout = PlanarLayout::new(&[3, 2], 2).unwrap();
    /// assert_eq!(layout.plane_len(), 12);
    /// let slot = layout.resolve(&[2, 1]).unwrap();
    /// assert_eq!(slot.cell, 0);
    /// assert_eq!(slot.offset, (1 * 3 + 2) * 2);
    /// ```
    pub fn resolve(&self, coord: &[i64]) -> Result<Slot> {
        self.check_rank(coord.len())?;

        for (axis, (&c, &extent)) in coord.iter().zip(&self.dims).enumerate() {
            if c < 0 || c as usize >= extent {
                return Err(Error::CoordOutOfRange { axis, coord: c, extent });
            }
        }

        let x = coord[0] as usize;
        let y = if self.dims.len() > 1 { coord[1] as usize } else { 0 };

        let mut cell = 0usize;
        for (k, stride) in self.plane_strides.iter().enumerate() {
            cell += coord[2 + k] as usize * stride;
        }

        Ok(Slot {
            cell,
            offset: (y * self.dims[0] + x) * self.entities_per_pixel,
        })
    }

    /// Reconstruct the coordinate a slot was resolved from
    ///
    /// Inverse of [`PlanarLayout::resolve`]: for every in-bounds coordinate
    /// `c`, `coordinate_of(resolve(c)) == c`. An offset pointing into the
    /// middle of a multi-entity pixel folds to that pixel's coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CellOutOfRange`] or [`Error::IndexOutOfRange`] when
    /// the slot does not address this layout.
    pub fn coordinate_of(&self, slot: Slot) -> Result<Vec<i64>> {
        if slot.cell >= self.planes {
            return Err(Error::CellOutOfRange {
                cell: slot.cell,
                cells: self.planes,
            });
        }
        if slot.offset >= self.plane_len {
            return Err(Error::IndexOutOfRange {
                index: slot.offset,
                len: self.plane_len,
            });
        }

        let pixel = slot.offset / self.entities_per_pixel;
        let mut coord = Vec::with_capacity(self.dims.len());
        coord.push((pixel % self.dims[0]) as i64);
        if self.dims.len() > 1 {
            coord.push((pixel / self.dims[0]) as i64);
        }

        let mut rest = slot.cell;
        for &extent in &self.dims[2.min(self.dims.len())..] {
            coord.push((rest % extent) as i64);
            rest /= extent;
        }

        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank1_single_plane() -> Result<()> {
        let layout = PlanarLayout::new(&[7], 1)?;
        assert_eq!(layout.planes(), 1);
        assert_eq!(layout.plane_len(), 7);
        assert_eq!(layout.height(), 1);
        let slot = layout.resolve(&[5])?;
        assert_eq!(slot, Slot { cell: 0, offset: 5 });
        assert_eq!(layout.coordinate_of(slot)?, vec![5]);
        Ok(())
    }

    #[test]
    fn test_rank2_row_major_offset() -> Result<()> {
        let layout = PlanarLayout::new(&[10, 4], 1)?;
        assert_eq!(layout.planes(), 1);
        let slot = layout.resolve(&[3, 2])?;
        assert_eq!(slot.cell, 0);
        assert_eq!(slot.offset, 2 * 10 + 3);
        Ok(())
    }

    #[test]
    fn test_five_axis_fold_depth_fastest() -> Result<()> {
        // [x, y, z, t, c]: plane = z + depth*t + depth*frames*c
        let layout = PlanarLayout::new(&[2, 2, 3, 4, 5], 1)?;
        assert_eq!(layout.planes(), 60);
        assert_eq!(layout.depth(), 3);
        assert_eq!(layout.frames(), 4);
        assert_eq!(layout.channels(), 5);

        let slot = layout.resolve(&[1, 0, 2, 3, 4])?;
        assert_eq!(slot.cell, 2 + 3 * 3 + 4 * 12);
        assert_eq!(slot.offset, 1);
        Ok(())
    }

    #[test]
    fn test_roundtrip_all_coordinates() -> Result<()> {
        let layout = PlanarLayout::new(&[3, 4, 2, 2], 1)?;
        for c3 in 0..2i64 {
            for c2 in 0..2i64 {
                for y in 0..4i64 {
                    for x in 0..3i64 {
                        let coord = vec![x, y, c2, c3];
                        let slot = layout.resolve(&coord)?;
                        assert_eq!(layout.coordinate_of(slot)?, coord);
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_roundtrip_with_entities() -> Result<()> {
        let layout = PlanarLayout::new(&[4, 3, 2], 2)?;
        assert_eq!(layout.plane_len(), 24);
        assert_eq!(layout.num_entities(), 48);

        let coord = vec![3, 1, 1];
        let slot = layout.resolve(&coord)?;
        assert_eq!(slot.offset, (1 * 4 + 3) * 2);
        assert_eq!(layout.coordinate_of(slot)?, coord);
        // Second entity of the pixel folds back to the same coordinate.
        assert_eq!(layout.coordinate_of(slot.entity(1))?, coord);
        Ok(())
    }

    #[test]
    fn test_resolve_rejects_wrong_rank() {
        let layout = PlanarLayout::new(&[3, 3], 1).unwrap();
        let err = layout.resolve(&[1, 1, 1]).unwrap_err();
        assert!(err.to_string().contains("Rank mismatch"));
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let layout = PlanarLayout::new(&[3, 3], 1).unwrap();
        assert!(layout.resolve(&[3, 0]).is_err());
        assert!(layout.resolve(&[0, -1]).is_err());
        let err = layout.resolve(&[0, 7]).unwrap_err();
        assert!(err.to_string().contains("axis 1"));
    }

    #[test]
    fn test_contains() -> Result<()> {
        let layout = PlanarLayout::new(&[3, 3], 1)?;
        assert!(layout.contains(&[0, 0])?);
        assert!(layout.contains(&[2, 2])?);
        assert!(!layout.contains(&[-1, 0])?);
        assert!(!layout.contains(&[0, 3])?);
        assert!(layout.contains(&[0]).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_construction() {
        assert!(PlanarLayout::new(&[], 1).is_err());
        assert!(PlanarLayout::new(&[4, 0, 2], 1).is_err());
        assert!(PlanarLayout::new(&[4, 4], 0).is_err());
    }

    #[test]
    fn test_coordinate_of_rejects_bad_slot() {
        let layout = PlanarLayout::new(&[2, 2, 2], 1).unwrap();
        assert!(layout.coordinate_of(Slot { cell: 2, offset: 0 }).is_err());
        assert!(layout.coordinate_of(Slot { cell: 0, offset: 4 }).is_err());
    }

    #[test]
    fn test_num_pixels() -> Result<()> {
        let layout = PlanarLayout::new(&[640, 480], 1)?;
        assert_eq!(layout.num_pixels(), 307_200);
        Ok(())
    }
}
