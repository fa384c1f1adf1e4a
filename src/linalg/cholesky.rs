use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{CholeskyState, Hints};
use crate::linalg::triangular::{back_substitute, forward_substitute};
use crate::linalg::{require_rows, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

#[inline]
fn check_pivot<T: FloatScalar>(k: usize, d: T, tol: T) -> Result<(), LinalgError> {
    if d < -tol {
        return Err(LinalgError::NotPositiveDefinite { index: k });
    }
    if d.abs() <= tol {
        return Err(LinalgError::not_invertible(k, d));
    }
    Ok(())
}

/// Cholesky decomposition in place: `A = Rᵗ·R` with `R` upper triangular.
///
/// Only the upper triangle of `a` is read and written; on return it holds R.
/// The strictly lower triangle is left unchanged. Returns the product of the
/// pivots taken before their square roots (the determinant of `A`).
///
/// A pivot below `-tol` fails with [`LinalgError::NotPositiveDefinite`]; a
/// pivot within `tol` of zero (semi-definite input) fails with
/// [`LinalgError::NotInvertible`].
pub fn cholesky_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    tol: T,
) -> Result<T, LinalgError> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "Cholesky decomposition requires a square matrix");

    let mut det = T::one();
    for k in 0..n {
        let d = *a.get(k, k);
        check_pivot(k, d, tol)?;
        det = det * d;

        let s = d.sqrt();
        let inv_s = T::one() / s;
        a.set(k, k, s);
        for j in (k + 1)..n {
            let r = *a.get(k, j) * inv_s;
            a.set(k, j, r);
        }

        // Symmetric update of the trailing upper triangle
        for j in (k + 1)..n {
            let r_kj = *a.get(k, j);
            for i in (k + 1)..=j {
                let v = *a.get(i, j) - *a.get(k, i) * r_kj;
                a.set(i, j, v);
            }
        }
    }
    Ok(det)
}

#[derive(Debug, Clone)]
struct CholeskyFactors<T> {
    r: DynMatrix<T>,
    l: DynMatrix<T>,
    determinant: T,
}

/// Cholesky decomposition `M = Rᵗ·R` of a symmetric positive-definite matrix.
///
/// Construction fails with [`LinalgError::Structure`] unless the hinted
/// structure is symmetric or diagonal.
///
/// # Example
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{CholeskyDecomposition, Decomposition, Hints};
///
/// let m = DynMatrix::from_diagonal(&[4.0_f64, 9.0]);
/// let chol = CholeskyDecomposition::new(Hints::new(&m)).unwrap();
/// assert_eq!(*chol.r().unwrap(), DynMatrix::from_diagonal(&[2.0, 3.0]));
/// assert_eq!(chol.determinant().unwrap(), 36.0);
/// ```
#[derive(Debug, Clone)]
pub struct CholeskyDecomposition<T> {
    hints: Hints<T>,
    state: CholeskyState,
    cache: FactorCache<CholeskyFactors<T>>,
}

impl<T: FloatScalar> CholeskyDecomposition<T> {
    pub fn new(hints: Hints<T>) -> Result<Self, LinalgError> {
        let state = hints.state::<CholeskyState>()?;
        Ok(Self {
            hints,
            state,
            cache: FactorCache::new(),
        })
    }

    #[inline]
    pub fn state(&self) -> CholeskyState {
        self.state
    }

    #[inline]
    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Mutable access to the source matrix. Call
    /// [`Decomposition::invalidate`] after editing it.
    pub fn source_mut(&mut self) -> &mut DynMatrix<T> {
        self.hints.matrix_mut()
    }

    fn factors(&self) -> Result<&CholeskyFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| {
            let m = self.hints.matrix();
            let n = m.nrows();
            let tol = self.hints.epsilon();

            let (r, determinant) = match self.state {
                CholeskyState::Diagonal => {
                    let diag = m.diagonal();
                    let mut det = T::one();
                    for (k, &d) in diag.iter().enumerate() {
                        check_pivot(k, d, tol)?;
                        det = det * d;
                    }
                    let roots: alloc::vec::Vec<T> = diag.iter().map(|d| d.sqrt()).collect();
                    (DynMatrix::from_diagonal(&roots), det)
                }
                CholeskyState::Symmetric => {
                    let mut work = m.clone();
                    let det = cholesky_in_place(&mut work, tol)?;
                    let r = DynMatrix::from_fn(n, n, |i, j| {
                        if i <= j {
                            work[(i, j)]
                        } else {
                            T::zero()
                        }
                    })
                    .with_structure(Structure::Upper);
                    (r, det)
                }
            };
            Ok(CholeskyFactors {
                l: r.transpose(),
                r,
                determinant,
            })
        })
    }

    /// Upper factor `R`.
    pub fn r(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.r)
    }

    /// Lower factor `L = Rᵗ`, so `M = L·Lᵗ`.
    pub fn l(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.l)
    }

    /// Natural log of the determinant: `2·Σ ln R[i,i]`.
    ///
    /// Stays finite where [`determinant`](Decomposition::determinant) would
    /// overflow or underflow.
    pub fn ln_determinant(&self) -> Result<T, LinalgError> {
        let two = T::one() + T::one();
        let r = &self.factors()?.r;
        Ok(r.diagonal().iter().fold(T::zero(), |acc, &d| acc + two * d.ln()))
    }
}

impl<T: FloatScalar> Decomposition<T> for CholeskyDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    /// `Rᵗ·y = b`, then `R·x = y`.
    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        require_rows("cholesky solve", b, f.r.nrows())?;
        let tol = self.hints.epsilon();
        let y = forward_substitute(&f.l, b, tol)?;
        back_substitute(&f.r, &y, tol)
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        Ok(self.factors()?.r.nrows())
    }

    /// Product of the pivots, `∏ R[i,i]²`.
    fn determinant(&self) -> Result<T, LinalgError> {
        Ok(self.factors()?.determinant)
    }

    /// Inverse, tagged symmetric.
    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = self.hints.matrix().nrows();
        let inv = self.solve(&DynMatrix::identity(n))?;
        Ok(inv.with_structure(Structure::Symmetric))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        match self.hints.state::<CholeskyState>() {
            Ok(state) => self.state = state,
            Err(e) => self.cache.fail(e),
        }
    }
}
