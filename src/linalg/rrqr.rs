use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, QrState};
use crate::linalg::permutation::Permutation;
use crate::linalg::qr::{accumulate_q, reflect_column, signed_diagonal_product};
use crate::linalg::triangular::{back_substitute, forward_substitute};
use crate::linalg::{require_rows, require_square, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

fn sub_column_norm<T: FloatScalar>(a: &impl MatrixMut<T>, col: usize, from: usize) -> T {
    let mut sum = T::zero();
    for i in from..a.nrows() {
        let v = *a.get(i, col);
        sum = sum + v * v;
    }
    sum.sqrt()
}

fn swap_columns<T: FloatScalar>(a: &mut impl MatrixMut<T>, x: usize, y: usize) {
    if x == y {
        return;
    }
    for i in 0..a.nrows() {
        let t = *a.get(i, x);
        a.set(i, x, *a.get(i, y));
        a.set(i, y, t);
    }
}

/// Householder QR with column pivoting, in place (`M ≥ N`): `A·P = Q·R`.
///
/// Before each reflection the remaining column with the largest sub-column
/// norm is swapped into the pivot position and recorded in `cols`.
/// Elimination stops once that norm is `≤ tol·(1 + ‖original column‖)`.
///
/// Returns `(rank, stop)`: the number of reflections performed and the
/// sub-column norm that stopped elimination (zero at full rank). Rows of the
/// packed matrix past the rank hold the unreduced residual.
pub fn rrqr_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    tau: &mut [T],
    cols: &mut Permutation,
    tol: T,
) -> (usize, T) {
    let m = a.nrows();
    let n = a.ncols();
    assert!(m >= n, "rank-revealing QR requires M >= N");
    assert_eq!(tau.len(), n, "tau length must equal N");
    assert_eq!(cols.len(), n, "permutation length must equal N");

    let mut original: Vec<T> = (0..n).map(|j| sub_column_norm(a, j, 0)).collect();

    for col in 0..n {
        let mut best = col;
        let mut best_norm = sub_column_norm(a, col, col);
        for j in (col + 1)..n {
            let norm = sub_column_norm(a, j, col);
            if norm > best_norm {
                best = j;
                best_norm = norm;
            }
        }

        if best_norm <= tol * (T::one() + original[best]) {
            debug!(
                "rank-revealing QR deflated at column {} of {}: residual norm {:?}",
                col, n, best_norm
            );
            return (col, best_norm);
        }

        swap_columns(a, col, best);
        original.swap(col, best);
        cols.swap(col, best);
        tau[col] = reflect_column(a, col);
    }
    (n, T::zero())
}

#[derive(Debug, Clone)]
struct RrqrFactors<T> {
    q: DynMatrix<T>,
    r: DynMatrix<T>,
    cols: Permutation,
    rank: usize,
    stop: T,
}

impl<T: FloatScalar> RrqrFactors<T> {
    /// Factors of a tall matrix. `R` keeps the residual block past the rank.
    fn tall(m: &DynMatrix<T>, tol: T) -> Self {
        let (nr, nc) = (m.nrows(), m.ncols());
        let mut work = m.clone();
        let mut tau = vec![T::zero(); nc];
        let mut cols = Permutation::identity(nc);
        let (rank, stop) = rrqr_in_place(&mut work, &mut tau, &mut cols, tol);

        let q = accumulate_q(&work, &tau[..rank], nr);
        let r = DynMatrix::from_fn(nr, nc, |i, j| {
            if i <= j || j >= rank {
                work[(i, j)]
            } else {
                T::zero()
            }
        });
        Self {
            q,
            r,
            cols,
            rank,
            stop,
        }
    }

    fn reflections(&self) -> usize {
        self.rank
    }
}

/// Rank-revealing Householder QR: `M·P = Q·R`.
///
/// Column pivoting orders R's diagonal by decreasing magnitude and stops at
/// the numerical rank. Rank deficiency is soft: the factorization succeeds,
/// [`rank`](Decomposition::rank) reports it and
/// [`approx`](Decomposition::approx) returns the basic solution, with zeros in
/// the non-pivot positions. Wide inputs factor the transpose,
/// `Mᵗ·P = Q'·R'`, and expose `M = P·R·Q` with `R = R'ᵗ` and `Q = Q'ᵗ`.
///
/// # Example
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{Decomposition, Hints, RankRevealingQr};
///
/// let m = DynMatrix::from_rows(3, 3, &[1.0_f64, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 0.0, 1.0]);
/// let qr = RankRevealingQr::new(Hints::new(&m));
/// assert_eq!(qr.rank().unwrap(), 2);
/// assert_eq!(qr.determinant().unwrap(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct RankRevealingQr<T> {
    hints: Hints<T>,
    state: QrState,
    cache: FactorCache<RrqrFactors<T>>,
}

impl<T: FloatScalar> RankRevealingQr<T> {
    pub fn new(hints: Hints<T>) -> Self {
        let state = QrState::from_hints(&hints);
        Self {
            hints,
            state,
            cache: FactorCache::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> QrState {
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

    fn factors(&self) -> Result<&RrqrFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| {
            let m = self.hints.matrix();
            let tol = self.hints.epsilon();
            Ok(match self.state {
                QrState::Orthogonal => RrqrFactors {
                    q: m.clone().with_structure(Structure::Orthogonal),
                    r: DynMatrix::identity(m.ncols()),
                    cols: Permutation::identity(m.ncols()),
                    rank: m.ncols(),
                    stop: T::zero(),
                },
                QrState::Upper | QrState::Tall => RrqrFactors::tall(m, tol),
                QrState::Wide => {
                    let f = RrqrFactors::tall(&m.transpose(), tol);
                    RrqrFactors {
                        q: f.q.transpose(),
                        r: f.r.transpose(),
                        ..f
                    }
                }
            })
        })
    }

    /// Orthogonal factor: `m × m` (tall) or `n × n` (wide).
    pub fn q(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.q)
    }

    /// Triangular factor, `m × n`: upper for tall inputs, lower for wide.
    pub fn r(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.r)
    }

    /// Column permutation `P` (tall, `n × n`) or row permutation (wide,
    /// `m × m`).
    pub fn p(&self) -> Result<DynMatrix<T>, LinalgError> {
        Ok(self.factors()?.cols.to_matrix::<T>().transpose())
    }

    /// Pivot order: entry `i` is the source column (tall) or row (wide)
    /// moved into position `i`.
    pub fn pivots(&self) -> Result<&Permutation, LinalgError> {
        Ok(&self.factors()?.cols)
    }
}

impl<T: FloatScalar> Decomposition<T> for RankRevealingQr<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("rrqr solve", self.hints.matrix())?;
        let f = self.factors()?;
        if f.rank < n {
            return Err(LinalgError::not_invertible(f.rank, f.stop));
        }
        self.approx(b)
    }

    /// Basic solution: least squares on the leading `rank` pivots, zeros
    /// elsewhere.
    fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        let m = self.hints.matrix();
        require_rows("rrqr approx", b, m.nrows())?;
        let tol = self.hints.epsilon();
        let k = f.rank;

        match self.state {
            QrState::Wide => {
                // M = P·L·Q: L·(Q·x) = Pᵗ·b
                let c = f.cols.permute_rows(b);
                let y = forward_substitute(&f.r.block(0, 0, k, k), &c.top_rows(k), tol)?;
                let mut w = DynMatrix::zeros(m.ncols(), b.ncols());
                w.set_block(0, 0, &y);
                Ok(f.q.tr_mul(&w))
            }
            _ => {
                // M·P = Q·R: R·(Pᵗ·x) = Qᵗ·b
                let c = f.q.tr_mul(b);
                let y = back_substitute(&f.r.block(0, 0, k, k), &c.top_rows(k), tol)?;
                let mut z = DynMatrix::zeros(m.ncols(), b.ncols());
                z.set_block(0, 0, &y);
                Ok(f.cols.unpermute_rows(&z))
            }
        }
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        Ok(self.factors()?.rank)
    }

    /// `(−1)^reflections · ∏ R[i,i] · sign(P)`; zero when rank-deficient.
    fn determinant(&self) -> Result<T, LinalgError> {
        let n = require_square("rrqr determinant", self.hints.matrix())?;
        let f = self.factors()?;
        if f.rank < n {
            return Ok(T::zero());
        }
        if self.state == QrState::Orthogonal {
            let t = RrqrFactors::tall(self.hints.matrix(), self.hints.epsilon());
            return Ok(signed_diagonal_product(&t.r, t.reflections()) * t.cols.sign::<T>());
        }
        Ok(signed_diagonal_product(&f.r, f.reflections()) * f.cols.sign::<T>())
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("rrqr inverse", self.hints.matrix())?;
        self.solve(&DynMatrix::identity(n))
    }

    /// Moore–Penrose inverse of a full-rank matrix, `n × m`.
    fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.approx(&DynMatrix::identity(self.hints.matrix().nrows()))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        self.state = QrState::from_hints(&self.hints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::assert_near;

    fn rrqr(m: &DynMatrix<f64>) -> RankRevealingQr<f64> {
        RankRevealingQr::new(Hints::new(m))
    }

    fn deficient() -> DynMatrix<f64> {
        // third column = first + second
        DynMatrix::from_rows(4, 3, &[
            1.0, 2.0, 3.0, //
            0.0, 1.0, 1.0, //
            2.0, 0.0, 2.0, //
            1.0, 1.0, 2.0,
        ])
    }

    #[test]
    fn reconstruct_with_pivoting() {
        let m = DynMatrix::from_rows(3, 3, &[1.0, 10.0, 2.0, 0.0, 20.0, 1.0, 3.0, 5.0, 4.0]);
        let d = rrqr(&m);
        assert_eq!(d.rank().unwrap(), 3);
        let p = d.p().unwrap();
        assert_near(&(d.q().unwrap() * d.r().unwrap()), &(&m * &p), 1e-10);
        // largest column moves first
        assert_eq!(d.pivots().unwrap().indices()[0], 1);
        let r = d.r().unwrap();
        assert!(r[(0, 0)].abs() >= r[(1, 1)].abs());
        assert!(r[(1, 1)].abs() >= r[(2, 2)].abs());
    }

    #[test]
    fn determinant_matches_lu() {
        let m = DynMatrix::from_rows(3, 3, &[1.0, 10.0, 2.0, 0.0, 20.0, 1.0, 3.0, 5.0, 4.0]);
        // 1·(80-5) - 10·(0-3) + 2·(0-60)
        let expected = 75.0 + 30.0 - 120.0;
        assert!((rrqr(&m).determinant().unwrap() - expected).abs() < 1e-10);

        let swap = DynMatrix::from_rows(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        assert!((rrqr(&swap).determinant().unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn reveals_rank_deficiency() {
        let m = deficient();
        let d = rrqr(&m);
        assert_eq!(d.rank().unwrap(), 2);
        let p = d.p().unwrap();
        assert_near(&(d.q().unwrap() * d.r().unwrap()), &(&m * &p), 1e-10);
        let r = d.r().unwrap();
        for i in 2..4 {
            assert!(r[(i, 2)].abs() < 1e-12);
        }
    }

    #[test]
    fn basic_solution_is_consistent() {
        let m = deficient();
        let d = rrqr(&m);
        // b in the range of M
        let b = &m * &DynMatrix::column(&[1.0, 1.0, 0.0]);
        let x = d.approx(&b).unwrap();
        assert_near(&(&m * &x), &b, 1e-10);
        let skipped = d.pivots().unwrap().indices()[2];
        assert_eq!(x[(skipped, 0)], 0.0);
    }

    #[test]
    fn square_deficient_cannot_solve() {
        let m = DynMatrix::from_rows(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 0.0, 1.0]);
        let d = rrqr(&m);
        assert_eq!(d.determinant().unwrap(), 0.0);
        assert!(matches!(
            d.solve(&DynMatrix::column(&[1.0, 1.0, 1.0])),
            Err(LinalgError::NotInvertible { index: 2, .. })
        ));
    }

    #[test]
    fn wide_factors() {
        let m = deficient().transpose();
        let d = rrqr(&m);
        assert_eq!(d.state(), QrState::Wide);
        assert_eq!(d.rank().unwrap(), 2);
        let p = d.p().unwrap();
        let prq = &(&p * d.r().unwrap()) * d.q().unwrap();
        assert_near(&prq, &m, 1e-10);

        let b = &m * &DynMatrix::column(&[1.0, -1.0, 2.0, 0.5]);
        let x = d.approx(&b).unwrap();
        assert_near(&(&m * &x), &b, 1e-10);
    }

    #[test]
    fn full_rank_wide_is_minimum_norm() {
        let m = DynMatrix::from_rows(2, 3, &[1.0, 0.0, 1.0, 0.0, 1.0, 1.0]);
        let x = rrqr(&m).approx(&DynMatrix::column(&[1.0, 1.0])).unwrap();
        assert_near(&x, &DynMatrix::column(&[1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0]), 1e-12);
    }

    #[test]
    fn orthogonal_is_full_rank() {
        let rot = DynMatrix::from_rows(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        let d = rrqr(&rot);
        assert_eq!(d.state(), QrState::Orthogonal);
        assert_eq!(d.rank().unwrap(), 2);
        assert!((d.determinant().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalidate_recomputes_rank() {
        let mut d = rrqr(&DynMatrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(d.rank().unwrap(), 2);
        d.source_mut()[(1, 1)] = 6.0;
        d.invalidate();
        assert_eq!(d.cache_state(), CacheState::Uninitialized);
        assert_eq!(d.rank().unwrap(), 1);
    }
}
