//! # densolve
//!
//! Dense matrix factorizations and linear-system solvers over real floats,
//! no-std compatible (`alloc` required). `f32` is the reference precision;
//! `f64` runs through the same generic code.
//!
//! ## Quick start
//!
//! ```
//! use densolve::DynMatrix;
//!
//! // Solve a linear system Ax = b
//! let a = DynMatrix::from_rows(3, 3, &[
//!     2.0_f64, 1.0, -1.0,
//!     -3.0, -1.0, 2.0,
//!     -2.0, 1.0, 2.0,
//! ]);
//! let b = DynMatrix::column(&[8.0, -11.0, -3.0]);
//! let x = a.solve(&b).unwrap(); // x = [2, 3, -1]
//! assert!((x[(0, 0)] - 2.0).abs() < 1e-12);
//! assert!((x[(2, 0)] + 1.0).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`dynmatrix`]: heap-allocated, column-major `DynMatrix<T>` with runtime
//!   dimensions. Arithmetic, norms, blocks, and the [`Structure`] tag with
//!   numerical detection.
//!
//! - [`linalg`]: the decompositions. Each one is built from [`Hints`] (one
//!   source matrix, a tolerance, and the resolved structure), factors lazily
//!   on first access, caches the result, and implements [`Decomposition`]:
//!   - [`linalg::TriangularSolver`]: forward / backward / diagonal substitution
//!   - [`linalg::GaussDecomposition`]: `P·M·Q = L·U`, full pivoting, any shape
//!   - [`linalg::CroutDecomposition`]: `M = P·L·U`, unit-diagonal `U`
//!   - [`linalg::CholeskyDecomposition`]: `M = Rᵗ·R`
//!   - [`linalg::HouseholderDecomposition`], [`linalg::GramSchmidtDecomposition`]:
//!     QR, or LQ for wide input
//!   - [`linalg::RankRevealingQr`]: `M·P = Q·R` with column pivoting
//!   - [`linalg::SvdDecomposition`]: `M = U·E·Vᵗ`
//!
//! - [`solver`]: [`Solver`] picks a decomposition from the structure
//!   ([`Method::Auto`]) and dispatches the [`Decomposition`] operations.
//!   Convenience methods on `DynMatrix`: `a.solve(&b)`, `a.approx(&b)`,
//!   `a.rank()`, `a.determinant()`, `a.inverse()`, `a.pseudoinverse()`.
//!
//! - [`traits`]: element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats (`Scalar + Float`), used by every decomposition
//!   - [`MatrixRef`] / [`MatrixMut`]: generic read/write access for algorithms
//!
//! ## Errors and logging
//!
//! Every fallible operation returns [`LinalgError`]. Rank deficiency is soft
//! where the algorithm can report it: `rank()` drops and `determinant()`
//! returns zero, only `solve()` fails. Diagnostics go through the `log`
//! facade; no logger is installed.
//!
//! ## Cargo features
//!
//! | Feature | Default  | Description |
//! |---------|----------|-------------|
//! | `std`   | yes      | Hardware FPU via system libm |
//! | `libm`  | no       | Pure-Rust software float fallback for `no_std` |

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod dynmatrix;
pub mod linalg;
pub mod solver;
pub mod traits;

pub use dynmatrix::{DynMatrix, DynMatrixf32, DynMatrixf64, Shape, Structure};
pub use linalg::{Decomposition, Hints, LinalgError, Tolerance};
pub use solver::{Method, Solver};
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
