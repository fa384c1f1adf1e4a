use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, LuState};
use crate::linalg::permutation::Permutation;
use crate::linalg::triangular::{back_substitute, forward_substitute};
use crate::linalg::{require_rows, require_square, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

/// Crout LU with partial pivoting, in place.
///
/// On return, `a` holds the packed factors of `P·A = L·U` (`P` gathers rows
/// in the order recorded in `rows`):
/// - Lower triangle (including diagonal): L
/// - Strictly upper part: U (diagonal of U is implicitly 1)
///
/// Each column of L is built from dot products against the finished part of
/// U, then the largest candidate among the unfinished rows becomes the pivot.
/// A pivot with magnitude `≤ tol` aborts with [`LinalgError::NotInvertible`].
pub fn crout_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    rows: &mut Permutation,
    tol: T,
) -> Result<(), LinalgError> {
    let n = a.nrows();
    assert_eq!(n, a.ncols(), "Crout decomposition requires a square matrix");
    assert_eq!(rows.len(), n, "permutation length must match matrix size");

    for j in 0..n {
        // L[i,j] = A[i,j] - Σ_{k<j} L[i,k]·U[k,j]
        for i in j..n {
            let mut sum = *a.get(i, j);
            for k in 0..j {
                sum = sum - *a.get(i, k) * *a.get(k, j);
            }
            a.set(i, j, sum);
        }

        let mut p = j;
        let mut max_val = a.get(j, j).abs();
        for i in (j + 1)..n {
            let val = a.get(i, j).abs();
            if val > max_val {
                max_val = val;
                p = i;
            }
        }
        if max_val <= tol {
            return Err(LinalgError::not_invertible(j, max_val));
        }

        if p != j {
            rows.swap(j, p);
            for c in 0..n {
                let tmp = *a.get(j, c);
                a.set(j, c, *a.get(p, c));
                a.set(p, c, tmp);
            }
        }

        // U[j,k] = (A[j,k] - Σ_{q<j} L[j,q]·U[q,k]) / L[j,j]
        let inv_pivot = T::one() / *a.get(j, j);
        for k in (j + 1)..n {
            let mut sum = *a.get(j, k);
            for q in 0..j {
                sum = sum - *a.get(j, q) * *a.get(q, k);
            }
            a.set(j, k, sum * inv_pivot);
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CroutFactors<T> {
    rows: Permutation,
    l: DynMatrix<T>,
    u: DynMatrix<T>,
}

/// Crout decomposition `M = P·L·U` with unit-diagonal `U`.
///
/// Square matrices only. Unlike [`GaussDecomposition`](crate::linalg::GaussDecomposition),
/// a zero pivot is a hard failure: the factorization fails with
/// [`LinalgError::NotInvertible`] and every accessor reports it.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{CroutDecomposition, Decomposition, Hints};
///
/// let m = DynMatrix::from_rows(2, 2, &[3.0_f64, 2.0, 1.0, 4.0]);
/// let crout = CroutDecomposition::new(Hints::new(&m)).unwrap();
/// let x = crout.solve(&DynMatrix::column(&[7.0, 9.0])).unwrap();
/// assert!((x[(0, 0)] - 1.0).abs() < 1e-12);
/// assert!((x[(1, 0)] - 2.0).abs() < 1e-12);
/// assert_eq!(crout.u().unwrap()[(1, 1)], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct CroutDecomposition<T> {
    hints: Hints<T>,
    state: LuState,
    cache: FactorCache<CroutFactors<T>>,
}

impl<T: FloatScalar> CroutDecomposition<T> {
    /// Fails with [`LinalgError::DimensionMismatch`] on non-square input.
    pub fn new(hints: Hints<T>) -> Result<Self, LinalgError> {
        require_square("crout", hints.matrix())?;
        let state = LuState::from_structure(hints.structure());
        Ok(Self {
            hints,
            state,
            cache: FactorCache::new(),
        })
    }

    #[inline]
    pub fn state(&self) -> LuState {
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

    fn factors(&self) -> Result<&CroutFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| self.factorize())
    }

    fn factorize(&self) -> Result<CroutFactors<T>, LinalgError> {
        let m = self.hints.matrix();
        let n = m.nrows();
        let tol = self.hints.epsilon();

        if self.state != LuState::Generic {
            let diag = m.diagonal();
            if let Some((i, &d)) = diag.iter().enumerate().find(|(_, d)| d.abs() <= tol) {
                return Err(LinalgError::not_invertible(i, d));
            }
            let (l, u) = match self.state {
                LuState::Upper => (
                    // L = D, U = D⁻¹·M
                    DynMatrix::from_diagonal(&diag),
                    DynMatrix::from_fn(n, n, |i, j| {
                        if i <= j {
                            m[(i, j)] / diag[i]
                        } else {
                            T::zero()
                        }
                    }),
                ),
                _ => (
                    DynMatrix::from_fn(n, n, |i, j| if i >= j { m[(i, j)] } else { T::zero() }),
                    DynMatrix::identity(n),
                ),
            };
            return Ok(CroutFactors {
                rows: Permutation::identity(n),
                l: l.with_structure(Structure::Lower),
                u: u.with_structure(Structure::Upper),
            });
        }

        let mut work = m.clone();
        let mut rows = Permutation::identity(n);
        crout_in_place(&mut work, &mut rows, tol)?;

        let l = DynMatrix::from_fn(n, n, |i, j| if i >= j { work[(i, j)] } else { T::zero() });
        let u = DynMatrix::from_fn(n, n, |i, j| match i.cmp(&j) {
            core::cmp::Ordering::Less => work[(i, j)],
            core::cmp::Ordering::Equal => T::one(),
            core::cmp::Ordering::Greater => T::zero(),
        });
        Ok(CroutFactors {
            rows,
            l: l.with_structure(Structure::Lower),
            u: u.with_structure(Structure::Upper),
        })
    }

    /// Permutation matrix `P` in `M = P·L·U`.
    pub fn p(&self) -> Result<DynMatrix<T>, LinalgError> {
        Ok(self.factors()?.rows.to_matrix::<T>().transpose())
    }

    /// Lower factor (carries the pivots on its diagonal).
    pub fn l(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.l)
    }

    /// Unit-diagonal upper factor.
    pub fn u(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.u)
    }
}

impl<T: FloatScalar> Decomposition<T> for CroutDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    /// `x = U⁻¹ · L⁻¹ · (Pᵗ·b)`.
    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        require_rows("crout solve", b, f.l.nrows())?;
        let tol = self.hints.epsilon();
        let y = forward_substitute(&f.l, &f.rows.permute_rows(b), tol)?;
        back_substitute(&f.u, &y, tol)
    }

    /// Full rank whenever the factorization succeeded.
    fn rank(&self) -> Result<usize, LinalgError> {
        Ok(self.factors()?.l.nrows())
    }

    fn determinant(&self) -> Result<T, LinalgError> {
        let f = self.factors()?;
        Ok(f.l.diagonal().iter().fold(f.rows.sign::<T>(), |acc, &d| acc * d))
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = self.hints.matrix().nrows();
        self.solve(&DynMatrix::identity(n))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        self.state = LuState::from_structure(self.hints.structure());
        if let Err(e) = require_square("crout", self.hints.matrix()) {
            self.cache.fail(e);
        }
    }
}
