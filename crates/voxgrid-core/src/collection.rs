//! Read-only collection view over a container's samples
//!
//! [`ValueCollection`] presents any container as a fixed-size collection:
//! its length is the product of the dimension vector and never changes.
//! The view declares no mutating operations at all, so "unsupported add"
//! is a missing method instead of a run-time failure.

use crate::container::Container;
use crate::cursor::RasterCursor;
use crate::error::Result;

/// Fixed-size, read-only view of every sample in a container
///
/// Samples are visited in raster order. For containers with more than one
/// entity per pixel the view addresses entity 0 of each pixel.
///
/// # Example
///
/// ```
/// use voxgrid_core::{Container, PlainArray, PlanarContainer, ValueCollection};
///
/// let mut img: PlanarContainer<PlainArray<u16>> = PlanarContainer::new(&[4, 3], 1)?;
/// img.set(&[2, 1], 7)?;
///
/// let values = ValueCollection::new(&img);
/// assert_eq!(values.len(), 12);
/// assert!(values.contains(7)?);
/// assert!(!values.contains(9)?);
/// # Ok::<(), voxgrid_core::Error>(())
/// ```
pub struct ValueCollection<'a, C: Container> {
    container: &'a C,
}

impl<'a, C: Container> ValueCollection<'a, C> {
    /// View over all samples of `container`
    pub fn new(container: &'a C) -> Self {
        Self { container }
    }

    /// Number of samples: the product of the dimension vector
    pub fn len(&self) -> usize {
        self.container.layout().num_pixels()
    }

    /// Check if the view holds no samples
    ///
    /// Always false for a constructed container; layouts reject zero
    /// extents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any sample equals `value`
    ///
    /// Scans in raster order and stops at the first match.
    ///
    /// # Errors
    ///
    /// Propagates read failures (closed container, unloaded cell).
    pub fn contains(&self, value: C::Elem) -> Result<bool> {
        let mut cursor = RasterCursor::new(self.container.layout());
        while cursor.has_next() {
            cursor.advance()?;
            if cursor.get(self.container)? == value {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Copy every sample out in raster order
    ///
    /// # Errors
    ///
    /// Propagates read failures (closed container, unloaded cell).
    pub fn to_vec(&self) -> Result<Vec<C::Elem>> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = RasterCursor::new(self.container.layout());
        while cursor.has_next() {
            cursor.advance()?;
            out.push(cursor.get(self.container)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::PlainArray;
    use crate::container::PlanarContainer;
    use crate::error::Error;

    #[test]
    fn test_len_is_product_of_dimensions() -> Result<()> {
        let img: PlanarContainer<PlainArray<u8>> = PlanarContainer::new(&[640, 480], 1)?;
        let values = ValueCollection::new(&img);
        assert_eq!(values.len(), 307_200);
        assert!(!values.is_empty());
        Ok(())
    }

    #[test]
    fn test_len_ignores_entities_per_pixel() -> Result<()> {
        // Two entities per pixel: still one collection element per pixel.
        let img: PlanarContainer<PlainArray<f32>> = PlanarContainer::new(&[4, 3], 2)?;
        let values = ValueCollection::new(&img);
        assert_eq!(values.len(), 12);
        Ok(())
    }

    #[test]
    fn test_contains_finds_written_sample() -> Result<()> {
        let mut img: PlanarContainer<PlainArray<i16>> = PlanarContainer::new(&[5, 4, 3], 1)?;
        img.set(&[4, 3, 2], -77)?;

        let values = ValueCollection::new(&img);
        assert!(values.contains(-77)?);
        assert!(values.contains(0)?);
        assert!(!values.contains(5)?);
        Ok(())
    }

    #[test]
    fn test_to_vec_is_raster_order() -> Result<()> {
        let mut img: PlanarContainer<PlainArray<u32>> = PlanarContainer::new(&[3, 2], 1)?;
        let mut cursor = img.raster_cursor();
        let mut rank = 0;
        while cursor.has_next() {
            cursor.advance()?;
            cursor.set(&mut img, rank)?;
            rank += 1;
        }

        let values = ValueCollection::new(&img);
        assert_eq!(values.to_vec()?, vec![0, 1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn test_reads_after_close_fail() -> Result<()> {
        let mut img: PlanarContainer<PlainArray<u8>> = PlanarContainer::new(&[2, 2], 1)?;
        img.close();

        let values = ValueCollection::new(&img);
        assert_eq!(values.len(), 4);
        assert!(matches!(values.contains(0).unwrap_err(), Error::Closed));
        assert!(matches!(values.to_vec().unwrap_err(), Error::Closed));
        Ok(())
    }
}
