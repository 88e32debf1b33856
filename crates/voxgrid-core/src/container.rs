//! Containers: storage ownership plus coordinate addressing
//!
//! A container owns a list of cells (one backing array per 2D plane) and
//! maps N-dimensional coordinates onto them through a [`PlanarLayout`]. It
//! knows nothing about traversal order; iteration lives in the cursor
//! family, which resolves positions against the container on every step.
//!
//! Containers are passed explicitly into cursor reads and writes rather
//! than back-referenced from the cursor: `&Container` read paths may be
//! shared freely across cursors (resolution is pure), while `&mut
//! Container` write paths are exclusive. The cache-backed variant in
//! [`crate::cache`] relaxes write exclusivity to per-cell locking.
//!
//! # Example
//!
//! ```
//! use voxgrid_core::access::PlainArray;
//! use voxgrid_core::container::{Container, PlanarContainer};
//!
//! let mut img = PlanarContainer::<PlainArray<u16>>::new(&[4, 3, 2], 1).unwrap();
//! img.set(&[1, 2, 1], 700).unwrap();
//! assert_eq!(img.get(&[1, 2, 1]).unwrap(), 700);
//! assert_eq!(img.planes(), 2);
//! ```

use crate::access::BackingArray;
use crate::bounds::OutOfBounds;
use crate::cursor::{PlaneCursor, RasterCursor, RegionCursor, SeekCursor};
use crate::error::{Error, Result};
use crate::layout::{PlanarLayout, Slot};
use crate::scalar::Scalar;

/// Addressing contract shared by every container kind
///
/// `read`/`write` are the two primitive sample accessors; everything else
/// (coordinate convenience access, cursor factories, axis accessors) is
/// provided on top of them and the layout.
pub trait Container {
    /// Sample type stored in the container
    type Elem: Scalar;

    /// The fixed cell geometry
    fn layout(&self) -> &PlanarLayout;

    /// Read the sample at a resolved slot
    fn read(&self, slot: Slot) -> Result<Self::Elem>;

    /// Write the sample at a resolved slot
    fn write(&mut self, slot: Slot, value: Self::Elem) -> Result<()>;

    /// Release every cell's resources
    ///
    /// Idempotent: repeated calls are safe no-ops. Reads and writes after
    /// close fail with [`Error::Closed`]; the dimension vector stays
    /// queryable for the container's lifetime.
    fn close(&mut self);

    /// Whether [`Container::close`] has run
    fn is_closed(&self) -> bool;

    /// The dimension vector, fixed for the container's lifetime
    fn dimensions(&self) -> &[usize] {
        self.layout().dims()
    }

    /// Number of axes
    fn rank(&self) -> usize {
        self.layout().rank()
    }

    /// Resolve an in-bounds coordinate to its storage slot
    ///
    /// Pure and deterministic; see [`PlanarLayout::resolve`].
    fn resolve(&self, coord: &[i64]) -> Result<Slot> {
        self.layout().resolve(coord)
    }

    /// Read the sample at a coordinate
    fn get(&self, coord: &[i64]) -> Result<Self::Elem> {
        let slot = self.resolve(coord)?;
        self.read(slot)
    }

    /// Write the sample at a coordinate
    fn set(&mut self, coord: &[i64], value: Self::Elem) -> Result<()> {
        let slot = self.resolve(coord)?;
        self.write(slot, value)
    }

    /// Extent of axis 0
    fn width(&self) -> usize {
        self.layout().width()
    }

    /// Extent of axis 1, or 1 when absent
    fn height(&self) -> usize {
        self.layout().height()
    }

    /// Extent of axis 2, or 1 when absent
    fn depth(&self) -> usize {
        self.layout().depth()
    }

    /// Extent of axis 3, or 1 when absent
    fn frames(&self) -> usize {
        self.layout().frames()
    }

    /// Extent of axis 4, or 1 when absent
    fn channels(&self) -> usize {
        self.layout().channels()
    }

    /// Number of cells (2D planes)
    fn planes(&self) -> usize {
        self.layout().planes()
    }

    /// Sequential row-major cursor over the whole domain
    fn raster_cursor(&self) -> RasterCursor
    where
        Self: Sized,
    {
        RasterCursor::new(self.layout())
    }

    /// Localizable cursor; out-of-bounds positioning is an error
    fn seek_cursor(&self) -> SeekCursor<Self::Elem>
    where
        Self: Sized,
    {
        SeekCursor::new(self.layout())
    }

    /// Localizable cursor with an out-of-bounds policy attached
    ///
    /// Any coordinate becomes legal for positioning and reads; the policy
    /// supplies the substitute for outside positions.
    fn seek_cursor_padded(&self, policy: OutOfBounds<Self::Elem>) -> SeekCursor<Self::Elem>
    where
        Self: Sized,
    {
        SeekCursor::with_bounds(self.layout(), policy)
    }

    /// Plane-by-plane cursor exposing the plane index and local (x, y)
    fn plane_cursor(&self) -> PlaneCursor
    where
        Self: Sized,
    {
        PlaneCursor::new(self.layout())
    }

    /// Row-major cursor over a rectangular sub-region
    ///
    /// # Errors
    ///
    /// Fails when ranks disagree, the region has a zero extent, or the
    /// region overhangs the container bounds.
    fn region_cursor(&self, origin: &[i64], size: &[usize]) -> Result<RegionCursor>
    where
        Self: Sized,
    {
        RegionCursor::new(self.layout(), origin, size)
    }
}

/// Eagerly allocated container: one backing array per plane, all present
/// from construction
///
/// Generic over the backing-array kind, so the same container works with
/// [`crate::access::PlainArray`] cells or [`crate::access::VolatileArray`]
/// cells when dirty tracking matters without a cache.
#[derive(Debug)]
pub struct PlanarContainer<A: BackingArray> {
    layout: PlanarLayout,
    cells: Vec<A>,
    closed: bool,
}

impl<A: BackingArray> PlanarContainer<A> {
    /// Allocate a container with zero-filled cells
    ///
    /// # Arguments
    ///
    /// * `dims` - one positive extent per axis
    /// * `entities_per_pixel` - adjacent primitive slots per coordinate
    ///
    /// # Errors
    ///
    /// Propagates layout validation failures
    /// ([`Error::InvalidDimensions`], [`Error::InvalidEntitiesPerPixel`]).
    #[tracing::instrument(fields(dims = ?dims, entities_per_pixel))]
    pub fn new(dims: &[usize], entities_per_pixel: usize) -> Result<Self> {
        let layout = PlanarLayout::new(dims, entities_per_pixel)?;
        let cells = (0..layout.planes()).map(|_| A::create(layout.plane_len())).collect();

        tracing::debug!(
            planes = layout.planes(),
            plane_len = layout.plane_len(),
            "planar_container_allocated"
        );

        Ok(Self {
            layout,
            cells,
            closed: false,
        })
    }

    /// Build a container over already-populated cells
    ///
    /// Used by the legacy plane-stack adapter: the cells are adopted
    /// without copying samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStack`] when the cell count or any cell
    /// length disagrees with the layout.
    pub fn from_cells(layout: PlanarLayout, cells: Vec<A>) -> Result<Self> {
        if cells.len() != layout.planes() {
            return Err(Error::InvalidStack(format!(
                "expected {} cells, got {}",
                layout.planes(),
                cells.len()
            )));
        }
        for (index, cell) in cells.iter().enumerate() {
            if cell.len() != layout.plane_len() {
                return Err(Error::InvalidStack(format!(
                    "cell {} has length {}, expected {}",
                    index,
                    cell.len(),
                    layout.plane_len()
                )));
            }
        }

        Ok(Self {
            layout,
            cells,
            closed: false,
        })
    }

    /// Borrow the backing array of one cell
    pub fn cell(&self, index: usize) -> Result<&A> {
        self.check_open()?;
        self.cells.get(index).ok_or(Error::CellOutOfRange {
            cell: index,
            cells: self.layout.planes(),
        })
    }

    /// Mutably borrow the backing array of one cell
    pub fn cell_mut(&mut self, index: usize) -> Result<&mut A> {
        self.check_open()?;
        let cells = self.layout.planes();
        self.cells
            .get_mut(index)
            .ok_or(Error::CellOutOfRange { cell: index, cells })
    }

    /// Contiguous sample slice of one plane
    ///
    /// The fast path for algorithms that work on whole 2D blocks.
    pub fn plane_slice(&self, index: usize) -> Result<&[A::Elem]> {
        Ok(self.cell(index)?.as_slice())
    }

    /// Overwrite every sample in the container with `value`
    #[tracing::instrument(skip(self, value), fields(planes = self.layout.planes()))]
    pub fn fill(&mut self, value: A::Elem) -> Result<()> {
        self.check_open()?;
        for cell in &mut self.cells {
            cell.fill(value);
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl<A: BackingArray> Container for PlanarContainer<A> {
    type Elem = A::Elem;

    fn layout(&self) -> &PlanarLayout {
        &self.layout
    }

    fn read(&self, slot: Slot) -> Result<A::Elem> {
        self.cell(slot.cell)?.get(slot.offset)
    }

    fn write(&mut self, slot: Slot, value: A::Elem) -> Result<()> {
        self.cell_mut(slot.cell)?.set(slot.offset, value)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        let released = self.cells.len();
        self.cells.clear();
        self.closed = true;
        tracing::debug!(cells_released = released, "planar_container_closed");
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
