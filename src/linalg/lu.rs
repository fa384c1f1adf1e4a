use log::debug;

use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, LuState};
use crate::linalg::permutation::Permutation;
use crate::linalg::triangular::{back_substitute, forward_substitute};
use crate::linalg::{require_rows, require_square, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

/// Gauss elimination with full pivoting, in place.
///
/// On return, `a` holds the packed factors of `P·A·Q = L·U`:
/// - Upper trapezoid (including diagonal): U
/// - Strictly lower part: L's multipliers (diagonal of L is implicitly 1)
///
/// `rows` and `cols` must start as identities of length `nrows` / `ncols`
/// and receive every pivot swap. Elimination stops at the first pivot whose
/// magnitude is `≤ tol`; the trailing block is zeroed. Returns the number of
/// pivots taken (the numerical rank) and the magnitude of the rejected pivot
/// (zero when elimination ran to completion).
pub fn gauss_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    rows: &mut Permutation,
    cols: &mut Permutation,
    tol: T,
) -> (usize, T) {
    let m = a.nrows();
    let n = a.ncols();
    assert_eq!(rows.len(), m, "row permutation length must match row count");
    assert_eq!(cols.len(), n, "column permutation length must match column count");

    for k in 0..m.min(n) {
        // Full pivoting: largest magnitude in the trailing submatrix
        let (mut pr, mut pc) = (k, k);
        let mut max_val = T::zero();
        for j in k..n {
            for i in k..m {
                let val = a.get(i, j).abs();
                if val > max_val {
                    max_val = val;
                    pr = i;
                    pc = j;
                }
            }
        }

        if max_val <= tol {
            debug!(
                "gauss: rank deflation at pivot {} of {}x{} (|max| = {:e})",
                k,
                m,
                n,
                max_val.to_f64_lossy()
            );
            for j in k..n {
                for i in k..m {
                    a.set(i, j, T::zero());
                }
            }
            return (k, max_val);
        }

        if pr != k {
            rows.swap(k, pr);
            for j in 0..n {
                let tmp = *a.get(k, j);
                a.set(k, j, *a.get(pr, j));
                a.set(pr, j, tmp);
            }
        }
        if pc != k {
            cols.swap(k, pc);
            for i in 0..m {
                let tmp = *a.get(i, k);
                a.set(i, k, *a.get(i, pc));
                a.set(i, pc, tmp);
            }
        }

        let inv_pivot = T::one() / *a.get(k, k);
        for i in (k + 1)..m {
            let l = *a.get(i, k) * inv_pivot;
            a.set(i, k, l);
        }

        // Rank-1 update of the trailing block
        for j in (k + 1)..n {
            let u_kj = *a.get(k, j);
            if u_kj == T::zero() {
                continue;
            }
            for i in (k + 1)..m {
                let v = *a.get(i, j) - *a.get(i, k) * u_kj;
                a.set(i, j, v);
            }
        }
    }

    (m.min(n), T::zero())
}

#[derive(Debug, Clone)]
struct GaussFactors<T> {
    rows: Permutation,
    cols: Permutation,
    l: DynMatrix<T>,
    u: DynMatrix<T>,
    rank: usize,
    /// Magnitude of the pivot that stopped elimination early.
    stop: Option<T>,
}

impl<T: FloatScalar> GaussFactors<T> {
    fn is_invertible(&self) -> bool {
        self.l.nrows() == self.u.ncols() && self.rank == self.u.ncols()
    }

    fn determinant(&self) -> T {
        if !self.is_invertible() {
            return T::zero();
        }
        let sign = self.rows.sign::<T>() * self.cols.sign::<T>();
        self.u.diagonal().iter().fold(sign, |acc, &d| acc * d)
    }
}

/// LU decomposition with full pivoting: `P·M·Q = L·U`.
///
/// Works on any `m × n` matrix. With `k = min(m, n)`, `L` is `m × k` unit
/// lower triangular and `U` is `k × n` upper trapezoidal. Rank deficiency is
/// soft: the factorization succeeds, [`rank`](Decomposition::rank) drops and
/// only [`solve`](Decomposition::solve) fails.
///
/// # Example
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{Decomposition, GaussDecomposition, Hints};
///
/// let m = DynMatrix::from_rows(2, 2, &[4.0_f64, 3.0, 6.0, 3.0]);
/// let lu = GaussDecomposition::new(Hints::new(&m));
/// assert!((lu.determinant().unwrap() + 6.0).abs() < 1e-12);
///
/// let x = lu.solve(&DynMatrix::column(&[10.0, 12.0])).unwrap();
/// assert!((x[(0, 0)] - 1.0).abs() < 1e-12);
/// assert!((x[(1, 0)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct GaussDecomposition<T> {
    hints: Hints<T>,
    state: LuState,
    cache: FactorCache<GaussFactors<T>>,
}

impl<T: FloatScalar> GaussDecomposition<T> {
    pub fn new(hints: Hints<T>) -> Self {
        let state = LuState::from_structure(hints.structure());
        Self {
            hints,
            state,
            cache: FactorCache::new(),
        }
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

    fn factors(&self) -> Result<&GaussFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| Ok(self.factorize()))
    }

    fn factorize(&self) -> GaussFactors<T> {
        let m = self.hints.matrix();
        let tol = self.hints.epsilon();
        let fast = match self.state {
            LuState::Generic => None,
            _ if m.diagonal().iter().any(|d| d.abs() <= tol) => None,
            LuState::Diagonal => Some((DynMatrix::identity(m.nrows()), upper_part(m, true))),
            LuState::Upper => Some((DynMatrix::identity(m.nrows()), upper_part(m, false))),
            LuState::Lower => {
                // L = M·D⁻¹ (unit diagonal), U = D
                let diag = m.diagonal();
                let l = DynMatrix::from_fn(m.nrows(), m.ncols(), |i, j| {
                    if i >= j {
                        m[(i, j)] / diag[j]
                    } else {
                        T::zero()
                    }
                });
                Some((l, DynMatrix::from_diagonal(&diag)))
            }
        };

        if let Some((l, u)) = fast {
            let n = m.nrows();
            return GaussFactors {
                rows: Permutation::identity(n),
                cols: Permutation::identity(n),
                l: l.with_structure(Structure::Lower),
                u: u.with_structure(Structure::Upper),
                rank: n,
                stop: None,
            };
        }

        let (nr, nc) = (m.nrows(), m.ncols());
        let k = nr.min(nc);
        let mut work = m.clone();
        let mut rows = Permutation::identity(nr);
        let mut cols = Permutation::identity(nc);
        let (rank, rejected) = gauss_in_place(&mut work, &mut rows, &mut cols, tol);
        let stop = (rank < k).then_some(rejected);

        let mut l = lower_unit(&work, k);
        let mut u = upper_part(&work.top_rows(k), false);
        if nr == nc {
            l.set_structure(Structure::Lower);
            u.set_structure(Structure::Upper);
        }
        GaussFactors {
            rows,
            cols,
            l,
            u,
            rank,
            stop,
        }
    }

    /// Row permutation matrix `P`.
    pub fn p(&self) -> Result<DynMatrix<T>, LinalgError> {
        Ok(self.factors()?.rows.to_matrix())
    }

    /// Column permutation matrix `Q`.
    pub fn q(&self) -> Result<DynMatrix<T>, LinalgError> {
        Ok(self.factors()?.cols.to_matrix::<T>().transpose())
    }

    /// Unit lower factor, `m × min(m, n)`.
    pub fn l(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.l)
    }

    /// Upper factor, `min(m, n) × n`.
    pub fn u(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.u)
    }

    /// Square with full numerical rank.
    pub fn is_invertible(&self) -> Result<bool, LinalgError> {
        Ok(self.factors()?.is_invertible())
    }
}

/// Unit lower factor from packed storage: `m × k`.
fn lower_unit<T: FloatScalar>(packed: &DynMatrix<T>, k: usize) -> DynMatrix<T> {
    DynMatrix::from_fn(packed.nrows(), k, |i, j| match i.cmp(&j) {
        core::cmp::Ordering::Equal => T::one(),
        core::cmp::Ordering::Greater => packed[(i, j)],
        core::cmp::Ordering::Less => T::zero(),
    })
}

/// Upper trapezoid of `a` (diagonal only when `diagonal_only`).
fn upper_part<T: FloatScalar>(a: &DynMatrix<T>, diagonal_only: bool) -> DynMatrix<T> {
    DynMatrix::from_fn(a.nrows(), a.ncols(), |i, j| {
        if i == j || (i < j && !diagonal_only) {
            a[(i, j)]
        } else {
            T::zero()
        }
    })
}

impl<T: FloatScalar> Decomposition<T> for GaussDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    /// `x = Q · U⁻¹ · L⁻¹ · (P·b)`.
    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("gauss solve", self.hints.matrix())?;
        require_rows("gauss solve", b, n)?;
        let f = self.factors()?;
        if !f.is_invertible() {
            return Err(LinalgError::not_invertible(
                f.rank,
                f.stop.unwrap_or_else(T::zero),
            ));
        }
        let tol = self.hints.epsilon();
        let y = forward_substitute(&f.l, &f.rows.permute_rows(b), tol)?;
        let z = back_substitute(&f.u, &y, tol)?;
        Ok(f.cols.unpermute_rows(&z))
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        Ok(self.factors()?.rank)
    }

    /// Zero when rank-deficient.
    fn determinant(&self) -> Result<T, LinalgError> {
        require_square("gauss determinant", self.hints.matrix())?;
        Ok(self.factors()?.determinant())
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("gauss inverse", self.hints.matrix())?;
        self.solve(&DynMatrix::identity(n))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        self.state = LuState::from_structure(self.hints.structure());
    }
}
