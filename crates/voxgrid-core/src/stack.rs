//! Adapter for external stack-of-planes data
//!
//! Legacy hyperstack tooling hands over pixel data as a flat stack of 2D
//! planes whose order is channel-fastest ("xyczt": channel, then depth,
//! then frame). [`PlaneStack`] describes such a stack and converts it into
//! a [`PlanarContainer`] whose cell order follows the coordinate fold of
//! [`PlanarLayout`] (depth-fastest). The axis permutation happens exactly
//! once, at conversion; plane buffers are moved, samples are never copied.

use crate::access::PlainArray;
use crate::container::PlanarContainer;
use crate::error::{Error, Result};
use crate::layout::PlanarLayout;
use crate::scalar::Scalar;

/// Drop trailing singleton axes from a dimension vector
///
/// Legacy stacks report every axis, singleton or not; containers index
/// tighter when unused trailing axes are gone. The first two axes (width,
/// height) always stay, and inner singletons are kept because dropping
/// them would renumber the axes behind them.
///
/// # Example
///
/// ```
/// use voxgrid_core::condense_dimensions;
///
/// assert_eq!(condense_dimensions(&[640, 480, 5, 1, 1]), vec![640, 480, 5]);
/// assert_eq!(condense_dimensions(&[640, 480, 1, 1, 3]), vec![640, 480, 1, 1, 3]);
/// ```
pub fn condense_dimensions(dims: &[usize]) -> Vec<usize> {
    let mut keep = dims.len();
    while keep > 2 && dims[keep - 1] == 1 {
        keep -= 1;
    }
    dims[..keep].to_vec()
}

/// External stack of 2D planes in legacy channel-fastest order
///
/// Plane `n` holds channel `n % channels` of depth slice
/// `(n / channels) % depth` in frame `n / (channels * depth)`. Each plane
/// is `width * height` samples in row-major order.
#[derive(Debug)]
pub struct PlaneStack<T: Scalar> {
    width: usize,
    height: usize,
    channels: usize,
    depth: usize,
    frames: usize,
    planes: Vec<Vec<T>>,
}

impl<T: Scalar> PlaneStack<T> {
    /// Wrap externally produced planes, validating shape
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for a zero extent and
    /// [`Error::InvalidStack`] when the plane count or a plane length does
    /// not match the declared shape.
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        depth: usize,
        frames: usize,
        planes: Vec<Vec<T>>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 || depth == 0 || frames == 0 {
            return Err(Error::InvalidDimensions {
                dims: vec![width, height, depth, frames, channels],
            });
        }
        let expected = channels * depth * frames;
        if planes.len() != expected {
            return Err(Error::InvalidStack(format!(
                "expected {} planes for {}c x {}z x {}t, got {}",
                expected,
                channels,
                depth,
                frames,
                planes.len()
            )));
        }
        let plane_len = width * height;
        for (index, plane) in planes.iter().enumerate() {
            if plane.len() != plane_len {
                return Err(Error::InvalidStack(format!(
                    "plane {} holds {} samples, expected {}",
                    index,
                    plane.len(),
                    plane_len
                )));
            }
        }
        Ok(Self {
            width,
            height,
            channels,
            depth,
            frames,
            planes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Number of planes in the stack
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    /// Flat stack index of the plane for `(channel, depth, frame)`
    ///
    /// The legacy channel-fastest fold: `c + z * C + t * C * Z`.
    pub fn stack_index(&self, channel: usize, depth: usize, frame: usize) -> Result<usize> {
        if channel >= self.channels {
            return Err(Error::PlaneOutOfRange {
                plane: channel,
                planes: self.channels,
            });
        }
        if depth >= self.depth {
            return Err(Error::PlaneOutOfRange {
                plane: depth,
                planes: self.depth,
            });
        }
        if frame >= self.frames {
            return Err(Error::PlaneOutOfRange {
                plane: frame,
                planes: self.frames,
            });
        }
        Ok(channel + depth * self.channels + frame * self.channels * self.depth)
    }

    /// Samples of the plane for `(channel, depth, frame)`
    pub fn plane(&self, channel: usize, depth: usize, frame: usize) -> Result<&[T]> {
        let index = self.stack_index(channel, depth, frame)?;
        Ok(&self.planes[index])
    }

    /// Mutable samples of the plane for `(channel, depth, frame)`
    pub fn plane_mut(&mut self, channel: usize, depth: usize, frame: usize) -> Result<&mut [T]> {
        let index = self.stack_index(channel, depth, frame)?;
        Ok(&mut self.planes[index])
    }

    /// Dimension vector of the converted container, condensed
    pub fn dimensions(&self) -> Vec<usize> {
        condense_dimensions(&[self.width, self.height, self.depth, self.frames, self.channels])
    }

    /// Convert into a container, permuting plane order to the layout fold
    ///
    /// Plane buffers move into the container's cells; no sample is copied.
    /// A plane at legacy index `c + z*C + t*C*Z` becomes the cell at
    /// `z + t*Z + c*Z*T`, so a sample written into plane `(c, z, t)` reads
    /// back at coordinate `[x, y, z, t, c]`.
    #[tracing::instrument(skip(self), fields(
        width = self.width,
        height = self.height,
        planes = self.planes.len()
    ))]
    pub fn into_container(self) -> Result<PlanarContainer<PlainArray<T>>> {
        let dims = self.dimensions();
        let layout = PlanarLayout::new(&dims, 1)?;

        let (channels, depth, frames) = (self.channels, self.depth, self.frames);
        let mut staged: Vec<(usize, Vec<T>)> = self
            .planes
            .into_iter()
            .enumerate()
            .map(|(index, plane)| {
                let c = index % channels;
                let z = (index / channels) % depth;
                let t = index / (channels * depth);
                (z + t * depth + c * depth * frames, plane)
            })
            .collect();
        staged.sort_unstable_by_key(|&(cell, _)| cell);

        let cells = staged
            .into_iter()
            .map(|(_, plane)| PlainArray::from_vec(plane))
            .collect();

        tracing::debug!(dims = ?dims, "plane_stack_converted");
        PlanarContainer::from_cells(layout, cells)
    }
}
