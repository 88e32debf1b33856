//! Backing arrays: the storage blocks containers address
//!
//! A backing array is a fixed-length, randomly indexable block of samples of
//! one scalar kind, owned exclusively by whichever container cell holds it.
//! Two implementations:
//!
//! - [`PlainArray`]: samples only, no bookkeeping. The eager container's cell.
//! - [`VolatileArray`]: adds the `valid`/`dirty` pair driving lazy loading and
//!   write-back. The cache-backed container's cell.
//!
//! # Volatile state machine
//!
//! ```text
//! Invalid ──load completes (mark_valid)──▶ Valid-Clean
//! Valid-Clean ──any write──▶ Valid-Dirty
//! Valid-Dirty ──write-back (clear_dirty)──▶ Valid-Clean
//! ```
//!
//! `valid` and `dirty` are independent: a write in `Invalid` state sets
//! `dirty` immediately while `valid` stays false, so a cell can be written
//! before its prior content has finished loading (write-through during cache
//! warm-up). Nothing clears `dirty` implicitly; only an explicit write-back
//! does.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::scalar::Scalar;

/// Fixed-length sample storage for one container cell
///
/// Length is established at creation and never changes. `get`/`set` are
/// bounds-checked and fail with [`Error::IndexOutOfRange`] instead of
/// panicking; bulk operations require exact length agreement.
pub trait BackingArray: Send + Sync {
    /// Sample type stored in the array
    type Elem: Scalar;

    /// Factory for a fresh, zero-filled array of the same concrete kind
    ///
    /// Arrays built this way always start valid: they are
    /// guaranteed-initialized scratch storage, unlike cache-loaded arrays
    /// which start invalid until their load completes.
    fn create(len: usize) -> Self
    where
        Self: Sized;

    /// Number of primitive slots in the array
    fn len(&self) -> usize;

    /// Check if the array has zero slots
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the sample at `index`
    fn get(&self, index: usize) -> Result<Self::Elem>;

    /// Write the sample at `index`
    ///
    /// On a volatile array this sets the dirty flag, regardless of the
    /// array's current state.
    fn set(&mut self, index: usize, value: Self::Elem) -> Result<()>;

    /// All samples as a slice
    fn as_slice(&self) -> &[Self::Elem];

    /// Overwrite every slot with `value`
    fn fill(&mut self, value: Self::Elem);

    /// Overwrite all slots from `src`, which must match the array length
    fn copy_from_slice(&mut self, src: &[Self::Elem]) -> Result<()>;

    /// Copy all samples out into a Vec
    fn to_vec(&self) -> Vec<Self::Elem> {
        self.as_slice().to_vec()
    }
}

#[inline]
fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::IndexOutOfRange { index, len });
    }
    Ok(())
}

#[inline]
fn check_same_len(src_len: usize, len: usize) -> Result<()> {
    if src_len != len {
        return Err(Error::LenMismatch {
            expected: len,
            actual: src_len,
        });
    }
    Ok(())
}

// ============================================================================
// PlainArray
// ============================================================================

/// Backing array with no load/write-back bookkeeping
///
/// The cell type of eagerly allocated containers: content is present from
/// construction on, so there is nothing to track.
#[derive(Debug, Clone)]
pub struct PlainArray<T: Scalar> {
    data: Box<[T]>,
}

impl<T: Scalar> PlainArray<T> {
    /// Wrap an existing sample vector without copying
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }
}

impl<T: Scalar> BackingArray for PlainArray<T> {
    type Elem = T;

    fn create(len: usize) -> Self {
        Self {
            data: vec![T::zeroed(); len].into_boxed_slice(),
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.data.len())?;
        Ok(self.data[index])
    }

    fn set(&mut self, index: usize, value: T) -> Result<()> {
        check_index(index, self.data.len())?;
        self.data[index] = value;
        Ok(())
    }

    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    fn copy_from_slice(&mut self, src: &[T]) -> Result<()> {
        check_same_len(src.len(), self.data.len())?;
        self.data.copy_from_slice(src);
        Ok(())
    }
}

// ============================================================================
// VolatileArray
// ============================================================================

/// Backing array with `valid`/`dirty` tracking for lazy loading
///
/// `valid` means the content has finished loading and may be safely read;
/// `dirty` means the content was locally written since the last write-back.
/// Both flags are atomics so the cache can observe them without holding the
/// data lock; per-cell write serialization is the owner's responsibility
/// (the cache wraps each volatile cell in a lock).
#[derive(Debug)]
pub struct VolatileArray<T: Scalar> {
    data: Box<[T]>,
    valid: AtomicBool,
    dirty: AtomicBool,
}

impl<T: Scalar> VolatileArray<T> {
    /// Create an invalid array awaiting an out-of-line load
    ///
    /// Starts `valid = false, dirty = false`; the loading layer fills the
    /// content through [`VolatileArray::load_slice`] and then calls
    /// [`VolatileArray::mark_valid`].
    pub fn invalid(len: usize) -> Self {
        Self {
            data: vec![T::zeroed(); len].into_boxed_slice(),
            valid: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
        }
    }

    /// Wrap existing samples with an explicit initial validity
    ///
    /// Dirty always starts false; content adopted at construction has
    /// nothing pending write-back.
    pub fn from_vec(data: Vec<T>, valid: bool) -> Self {
        Self {
            data: data.into_boxed_slice(),
            valid: AtomicBool::new(valid),
            dirty: AtomicBool::new(false),
        }
    }

    /// Whether the content has finished loading
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Whether the content was written since the last write-back
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Record load completion: `Invalid -> Valid-Clean` (dirty untouched)
    ///
    /// Called once by the loading layer after the content is fully present.
    /// Must never be called for a cancelled or failed load.
    pub fn mark_valid(&self) {
        self.valid.store(true, Ordering::Release);
    }

    /// Record write-back completion: `Valid-Dirty -> Valid-Clean`
    ///
    /// The caller must guarantee that no writes are in flight for this
    /// array when clearing, or a just-written sample could be silently
    /// dropped from the next write-back. The cache does this by holding the
    /// cell's write lock across store-and-clear.
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Mutable sample view for the loading layer
    ///
    /// Bypasses dirty tracking: filling an array from its backing store is
    /// a load, not a local mutation. User-visible writes go through
    /// [`BackingArray::set`].
    pub fn load_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Scalar> BackingArray for VolatileArray<T> {
    type Elem = T;

    /// Fresh scratch array: zero-filled and already valid
    fn create(len: usize) -> Self {
        Self {
            data: vec![T::zeroed(); len].into_boxed_slice(),
            valid: AtomicBool::new(true),
            dirty: AtomicBool::new(false),
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.data.len())?;
        Ok(self.data[index])
    }

    fn set(&mut self, index: usize, value: T) -> Result<()> {
        check_index(index, self.data.len())?;
        // Dirty is raised before the sample lands so a flag observer can
        // never see clean state with an unrecorded write already applied.
        self.dirty.store(true, Ordering::Release);
        self.data[index] = value;
        Ok(())
    }

    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn fill(&mut self, value: T) {
        self.dirty.store(true, Ordering::Release);
        self.data.fill(value);
    }

    #[tracing::instrument(skip(self, src), fields(len = self.data.len(), src_len = src.len()))]
    fn copy_from_slice(&mut self, src: &[T]) -> Result<()> {
        check_same_len(src.len(), self.data.len())?;
        self.dirty.store(true, Ordering::Release);
        self.data.copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_array_create_zeroed() {
        let arr = PlainArray::<u16>::create(8);
        assert_eq!(arr.len(), 8);
        assert!(arr.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_plain_array_get_set() -> Result<()> {
        let mut arr = PlainArray::<f32>::create(4);
        arr.set(2, 1.5)?;
        assert_eq!(arr.get(2)?, 1.5);
        assert_eq!(arr.get(0)?, 0.0);
        Ok(())
    }

    #[test]
    fn test_plain_array_bounds() {
        let mut arr = PlainArray::<u8>::create(3);
        assert!(arr.get(3).is_err());
        assert!(arr.set(3, 1).is_err());
        let err = arr.get(10).unwrap_err();
        assert!(err.to_string().contains("Index 10 out of range"));
    }

    #[test]
    fn test_plain_array_from_vec_no_copy_semantics() -> Result<()> {
        let arr = PlainArray::from_vec(vec![5u32, 6, 7]);
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(1)?, 6);
        Ok(())
    }

    #[test]
    fn test_create_factory_starts_valid() {
        let arr = VolatileArray::<i64>::create(16);
        assert!(arr.is_valid());
        assert!(!arr.is_dirty());
    }

    #[test]
    fn test_invalid_constructor_starts_invalid_and_clean() {
        let arr = VolatileArray::<i64>::invalid(16);
        assert!(!arr.is_valid());
        assert!(!arr.is_dirty());
    }

    #[test]
    fn test_write_sets_dirty() -> Result<()> {
        let mut arr = VolatileArray::<u8>::create(4);
        assert!(!arr.is_dirty());
        arr.set(0, 42)?;
        assert!(arr.is_dirty());
        assert_eq!(arr.get(0)?, 42);
        Ok(())
    }

    #[test]
    fn test_write_while_invalid_keeps_valid_false() -> Result<()> {
        // Write-through during cache warm-up: dirty and valid move
        // independently.
        let mut arr = VolatileArray::<u16>::invalid(4);
        arr.set(1, 99)?;
        assert!(arr.is_dirty());
        assert!(!arr.is_valid());
        arr.mark_valid();
        assert!(arr.is_valid());
        assert!(arr.is_dirty());
        Ok(())
    }

    #[test]
    fn test_dirty_epoch_cycle() -> Result<()> {
        // Valid-Clean -> writes -> Valid-Dirty -> write-back -> Valid-Clean
        // -> write -> Valid-Dirty again.
        let mut arr = VolatileArray::<f64>::create(8);
        for i in 0..8 {
            arr.set(i, i as f64)?;
        }
        assert!(arr.is_dirty());
        assert!(arr.is_valid());

        arr.clear_dirty();
        assert!(!arr.is_dirty());
        assert!(arr.is_valid());

        arr.set(3, -1.0)?;
        assert!(arr.is_dirty());
        Ok(())
    }

    #[test]
    fn test_clear_dirty_does_not_touch_data() -> Result<()> {
        let mut arr = VolatileArray::<u32>::create(2);
        arr.set(0, 7)?;
        arr.clear_dirty();
        assert_eq!(arr.get(0)?, 7);
        Ok(())
    }

    #[test]
    fn test_load_slice_bypasses_dirty() {
        let mut arr = VolatileArray::<u8>::invalid(4);
        arr.load_slice().copy_from_slice(&[1, 2, 3, 4]);
        arr.mark_valid();
        assert!(arr.is_valid());
        assert!(!arr.is_dirty());
        assert_eq!(arr.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_volatile_bounds_check_before_dirty() {
        let mut arr = VolatileArray::<u8>::create(2);
        assert!(arr.set(5, 1).is_err());
        // A rejected write must not raise dirty.
        assert!(!arr.is_dirty());
    }

    #[test]
    fn test_fill_and_copy_set_dirty() -> Result<()> {
        let mut arr = VolatileArray::<i32>::create(3);
        arr.fill(-2);
        assert!(arr.is_dirty());
        assert_eq!(arr.to_vec(), vec![-2, -2, -2]);

        arr.clear_dirty();
        arr.copy_from_slice(&[1, 2, 3])?;
        assert!(arr.is_dirty());
        assert_eq!(arr.as_slice(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_copy_from_slice_length_mismatch() {
        let mut arr = VolatileArray::<i32>::create(3);
        assert!(arr.copy_from_slice(&[1, 2]).is_err());
    }
}
