pub mod cache;
pub(crate) mod cholesky;
pub(crate) mod crout;
pub(crate) mod gram_schmidt;
pub mod hints;
pub(crate) mod lu;
pub mod permutation;
pub(crate) mod qr;
pub(crate) mod rrqr;
pub(crate) mod svd;
pub mod triangular;

pub use cache::{CacheState, FactorCache};
pub use cholesky::CholeskyDecomposition;
pub use crout::CroutDecomposition;
pub use gram_schmidt::GramSchmidtDecomposition;
pub use hints::{
    AlgorithmState, CholeskyState, Hints, LuState, QrState, SvdState, Tolerance, TriangularState,
};
pub use lu::GaussDecomposition;
pub use permutation::Permutation;
pub use qr::HouseholderDecomposition;
pub use rrqr::RankRevealingQr;
pub use svd::SvdDecomposition;
pub use triangular::{back_substitute, diagonal_substitute, forward_substitute, TriangularSolver};

use crate::traits::FloatScalar;
use crate::DynMatrix;

/// Errors from linear algebra operations.
///
/// Raised where the problem is detected and propagated unchanged. Soft rank
/// deficiency is not an error: `rank()` drops and `determinant()` returns
/// zero, only `solve()` fails.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::LinalgError;
///
/// let singular = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
/// assert!(matches!(
///     singular.solve(&DynMatrix::column(&[1.0, 2.0])),
///     Err(LinalgError::NotInvertible { .. })
/// ));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LinalgError {
    /// Operand sizes are incompatible with the operation.
    #[error("dimension mismatch in {op}: expected {expected}, got {got}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },
    /// The matrix does not have the structure the algorithm requires.
    #[error("{op} requires a {required} matrix")]
    Structure {
        op: &'static str,
        required: &'static str,
    },
    /// A pivot fell below the tolerance.
    #[error("matrix is not invertible: pivot {index} has magnitude {magnitude:e}")]
    NotInvertible { index: usize, magnitude: f64 },
    /// Negative pivot during Cholesky factorization.
    #[error("matrix is not positive definite: negative pivot at {index}")]
    NotPositiveDefinite { index: usize },
    /// The chosen decomposition does not provide this operation.
    #[error("{op} is not provided by {method}")]
    Unsupported {
        op: &'static str,
        method: &'static str,
    },
}

impl LinalgError {
    pub(crate) fn not_invertible<T: FloatScalar>(index: usize, magnitude: T) -> Self {
        LinalgError::NotInvertible {
            index,
            magnitude: magnitude.abs().to_f64_lossy(),
        }
    }
}

/// Common interface over every factorization.
///
/// `approx` defaults to `solve` and `pseudoinverse` defaults to `inverse`;
/// decompositions that can do better override them.
pub trait Decomposition<T: FloatScalar> {
    /// Configuration the decomposition was built from.
    fn hints(&self) -> &Hints<T>;

    /// Solve `M·x = b` exactly (square, full-rank `M`).
    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError>;

    /// Least-squares (or minimum-norm) solution of `M·x ≈ b`.
    fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        self.solve(b)
    }

    fn rank(&self) -> Result<usize, LinalgError>;

    fn determinant(&self) -> Result<T, LinalgError>;

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError>;

    fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.inverse()
    }

    /// Drop cached factors and re-derive the algorithm state from the
    /// (possibly edited) source matrix.
    fn invalidate(&mut self);
}

/// Fails unless `m` is square.
pub(crate) fn require_square<T>(op: &'static str, m: &DynMatrix<T>) -> Result<usize, LinalgError> {
    if m.nrows() != m.ncols() {
        return Err(LinalgError::DimensionMismatch {
            op,
            expected: m.nrows(),
            got: m.ncols(),
        });
    }
    Ok(m.nrows())
}

/// Fails unless `b` has `rows` rows.
pub(crate) fn require_rows<T>(
    op: &'static str,
    b: &DynMatrix<T>,
    rows: usize,
) -> Result<(), LinalgError> {
    if b.nrows() != rows {
        return Err(LinalgError::DimensionMismatch {
            op,
            expected: rows,
            got: b.nrows(),
        });
    }
    Ok(())
}

/// Entry-wise comparison used by the unit tests.
#[cfg(test)]
pub(crate) fn assert_near(a: &DynMatrix<f64>, b: &DynMatrix<f64>, tol: f64) {
    assert_eq!(
        (a.nrows(), a.ncols()),
        (b.nrows(), b.ncols()),
        "shape mismatch"
    );
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            assert!(
                (a[(i, j)] - b[(i, j)]).abs() < tol,
                "mismatch at ({},{}): {} vs {}",
                i,
                j,
                a[(i, j)],
                b[(i, j)]
            );
        }
    }
}
