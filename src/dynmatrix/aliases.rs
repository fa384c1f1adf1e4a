//! Pre-defined type aliases for the supported `DynMatrix` element types.

use super::DynMatrix;

/// Dynamic matrix with `f32` elements (reference precision).
pub type DynMatrixf32 = DynMatrix<f32>;
/// Dynamic matrix with `f64` elements.
pub type DynMatrixf64 = DynMatrix<f64>;
