//! # voxgrid - N-Dimensional Typed Container Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`voxgrid_core`] - containers, layouts, cursors, out-of-bounds
//!   policies, the cell cache, and the legacy plane-stack adapter. Its
//!   public surface is re-exported here.
//! - [`voxgrid_tracing`] (as [`trace`]) - shared `tracing` subscriber
//!   configuration for binaries, tests, and tools.
//!
//! ## Example
//!
//! ```
//! use voxgrid::{Container, PlainArray, PlanarContainer};
//!
//! let mut img: PlanarContainer<PlainArray<u8>> = PlanarContainer::new(&[16, 16], 1)?;
//! img.set(&[3, 5], 200)?;
//!
//! let mut cursor = img.raster_cursor();
//! let mut max = 0;
//! while cursor.has_next() {
//!     cursor.advance()?;
//!     max = max.max(cursor.get(&img)?);
//! }
//! assert_eq!(max, 200);
//! # Ok::<(), voxgrid::Error>(())
//! ```

pub use voxgrid_core::*;

pub use voxgrid_tracing as trace;
