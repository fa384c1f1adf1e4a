use core::fmt::Debug;
use num_traits::{Float, Num, NumCast, One, Zero};

use crate::dynmatrix::Structure;

/// Trait for types that can be used as matrix elements.
///
/// Blanket-implemented for all types satisfying the bounds.
/// Covers `f32`, `f64`, and all integer types.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for floating-point matrix elements.
///
/// Required by every decomposition (`sqrt`, `abs`, `epsilon`).
/// Blanket-implemented for `f32` and `f64`.
pub trait FloatScalar: Scalar + Float {
    /// Convert a count (dimension, ULP multiplier) into `Self`.
    #[inline]
    fn from_count(n: usize) -> Self {
        <Self as NumCast>::from(n).unwrap_or_else(Self::max_value)
    }

    /// Lossy conversion used for error payloads.
    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl<T: Scalar + Float> FloatScalar for T {}

/// Read-only access to a matrix-like type.
///
/// This is the collaborator interface the decompositions consume: dimensions,
/// element access, and the structural hint used to pick fast paths.
pub trait MatrixRef<T> {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> &T;

    /// Declared structure of the matrix. Never trusted for correctness.
    #[inline]
    fn structure(&self) -> Structure {
        Structure::Unknown
    }
}

/// Mutable access to a matrix-like type.
///
/// Extends `MatrixRef` with mutable element access, enabling
/// in-place algorithms (Householder, bidiagonalization, etc.) to work generically.
pub trait MatrixMut<T>: MatrixRef<T> {
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T;

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: T) {
        *self.get_mut(row, col) = value;
    }
}
