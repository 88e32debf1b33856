//! Scalar kinds storable in backing arrays
//!
//! The numeric surface is a closed set of ten primitive kinds dispatched
//! through one trait, instead of a type hierarchy per kind. Algorithms that
//! only need "a number" go through [`Scalar::to_f64`] / [`Scalar::from_f64`];
//! algorithms that know the concrete kind stay fully typed and pay nothing.
//!
//! # Example
//!
//! ```
//! use voxgrid_core::scalar::{Scalar, ScalarKind};
//!
//! assert_eq!(<u16 as Scalar>::KIND, ScalarKind::U16);
//! assert_eq!(u16::from_f64(300.7), 300);
//! assert_eq!(u16::from_f64(-5.0), 0); // integer kinds saturate
//! assert_eq!(2.5f32.to_f64(), 2.5);
//! ```

/// Tag for each primitive kind a backing array can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl ScalarKind {
    /// Size of one sample of this kind in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::F32 => 4,
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::F64 => 8,
        }
    }

    /// Whether the kind is floating point
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// Lowercase kind name, for log fields and messages
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::U8 => "u8",
            ScalarKind::I8 => "i8",
            ScalarKind::U16 => "u16",
            ScalarKind::I16 => "i16",
            ScalarKind::U32 => "u32",
            ScalarKind::I32 => "i32",
            ScalarKind::U64 => "u64",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
        }
    }
}

/// Capability bound for every sample type the containers can store
///
/// Implemented for exactly the primitives named by [`ScalarKind`]. The
/// `bytemuck` supertraits give zero-filled allocation and byte-level
/// reinterpretation of externally owned buffers; `PartialEq` is the value
/// equality used by read-only collection views.
pub trait Scalar:
    bytemuck::Pod + PartialEq + PartialOrd + std::fmt::Debug + Send + Sync + 'static
{
    /// The kind tag for this primitive
    const KIND: ScalarKind;

    /// Convert from an f64 sample value
    ///
    /// Integer kinds saturate to their range and truncate the fraction
    /// (standard `as` cast semantics); NaN converts to zero.
    fn from_f64(value: f64) -> Self;

    /// Widen to an f64 sample value
    fn to_f64(self) -> f64;
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::$kind;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_scalar! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}
