//! # voxgrid-core - N-Dimensional Typed Containers
//!
//! Storage-agnostic n-dimensional sample containers with pluggable backing
//! arrays, deterministic cursors, and an explicit cell cache.
//!
//! ## Architecture
//!
//! voxgrid-core separates three concerns that image-processing code tends
//! to entangle:
//!
//! - **Storage**: a [`BackingArray`] is a fixed-length block of one scalar
//!   kind. [`PlainArray`] is eager memory; [`VolatileArray`] adds the
//!   valid/dirty state machine for asynchronously loaded, write-back data.
//! - **Addressing**: a [`PlanarLayout`] folds an n-dimensional coordinate
//!   into a [`Slot`] (cell index plus intra-cell offset) and back.
//!   Containers own cells; cells know nothing about their container.
//! - **Traversal**: cursors ([`RasterCursor`], [`SeekCursor`],
//!   [`PlaneCursor`], [`RegionCursor`]) hold positions, not borrows. They
//!   resolve slots through the layout and take the container as an argument
//!   on each read or write, so the borrow checker enforces the
//!   many-readers/one-writer contract instead of a runtime lock.
//!
//! Out-of-bounds access is never implicit: a [`SeekCursor`] only yields
//! substitute values outside the domain when an [`OutOfBounds`] policy
//! (constant, clamp, periodic, mirror) was attached explicitly.
//!
//! Lazily materialized data goes through [`CellCache`]: cells load on
//! first read touch, writes raise the dirty flag, and
//! [`CellCache::flush`] or LRU eviction writes dirty cells back through a
//! [`CellLoader`]. The cache is an explicit object passed to
//! [`CachedContainer`], never ambient state.
//!
//! ## Example
//!
//! ```
//! use voxgrid_core::{Container, OutOfBounds, PlainArray, PlanarContainer};
//!
//! // A 2-channel 2D image: x = 4, y = 3, two entities per pixel.
//! let mut img: PlanarContainer<PlainArray<f32>> = PlanarContainer::new(&[4, 3], 2)?;
//! img.set(&[2, 1], 0.5)?;
//!
//! // Raster scan: x fastest, then y.
//! let mut sum = 0.0;
//! let mut cursor = img.raster_cursor();
//! while cursor.has_next() {
//!     cursor.advance()?;
//!     sum += cursor.get(&img)?;
//! }
//! assert_eq!(sum, 0.5);
//!
//! // Neighborhood access beyond the edge through an explicit policy.
//! let mut probe = img.seek_cursor_padded(OutOfBounds::Constant(0.0));
//! probe.set_position(&[-1, 0])?;
//! assert_eq!(probe.get(&img)?, 0.0);
//! # Ok::<(), voxgrid_core::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`access`] - Backing arrays: plain and volatile/dirty
//! - [`layout`] - Coordinate-to-slot folding and planar geometry
//! - [`container`] - The [`Container`] trait and [`PlanarContainer`]
//! - [`cursor`] - Raster, seek, plane and region cursors
//! - [`bounds`] - Out-of-bounds policies for padded access
//! - [`cache`] - Cell cache, loaders and [`CachedContainer`]
//! - [`collection`] - Read-only collection view over all samples
//! - [`stack`] - Legacy channel-fastest plane-stack adapter

pub mod access;
pub mod bounds;
pub mod cache;
pub mod collection;
pub mod container;
pub mod cursor;
pub mod error;
pub mod layout;
pub mod scalar;
pub mod stack;

// Re-export primary types
pub use access::{BackingArray, PlainArray, VolatileArray};
pub use bounds::{clamp_axis, mirror_axis, periodic_axis, OutOfBounds, Substitute};
pub use cache::{CachedContainer, CellCache, CellHandle, CellLoader, EvictionPolicy};
pub use collection::ValueCollection;
pub use container::{Container, PlanarContainer};
pub use cursor::{PlaneCursor, RasterCursor, RegionCursor, SeekCursor};
pub use error::{Error, Result};
pub use layout::{PlanarLayout, Slot};
pub use scalar::{Scalar, ScalarKind};
pub use stack::{condense_dimensions, PlaneStack};
