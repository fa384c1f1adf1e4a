use alloc::vec;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, SvdState};
use crate::linalg::qr::reflect_column;
use crate::linalg::{require_rows, require_square, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

/// Hard cap on diagonalization sweeps.
const MAX_SWEEPS: usize = 1000;

/// Givens rotation `(c, s)` with `-s·a + c·b = 0`.
fn givens<T: FloatScalar>(a: T, b: T) -> (T, T) {
    if b == T::zero() {
        (T::one(), T::zero())
    } else if b.abs() > a.abs() {
        let t = a / b;
        let s = T::one() / (T::one() + t * t).sqrt();
        (s * t, s)
    } else {
        let t = b / a;
        let c = T::one() / (T::one() + t * t).sqrt();
        (c, c * t)
    }
}

/// `[m[:,i], m[:,j]] ← [c·m[:,i] + s·m[:,j], c·m[:,j] − s·m[:,i]]`
fn rotate_cols<T: FloatScalar>(m: &mut impl MatrixMut<T>, i: usize, j: usize, c: T, s: T) {
    for row in 0..m.nrows() {
        let a = *m.get(row, i);
        let b = *m.get(row, j);
        m.set(row, i, c * a + s * b);
        m.set(row, j, c * b - s * a);
    }
}

// ── Householder bidiagonalization ───────────────────────────────────

/// Householder bidiagonalization: reduce an M×N matrix (M ≥ N) to upper
/// bidiagonal form.
///
/// `u` (M×M) and `v` (N×N) must hold the identity on entry; on return
/// `A = U · B · Vᵗ` with `B = bidiag(diag, off_diag)`.
///
/// Returns the number of reflections applied. Each has determinant −1, so
/// for square `A`, `det A = (−1)^count · ∏ diag`.
pub(crate) fn bidiagonalize<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    diag: &mut [T],
    off_diag: &mut [T],
    u: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
) -> usize {
    let m = a.nrows();
    let n = a.ncols();
    assert!(m >= n, "bidiagonalize requires M >= N");
    assert!(diag.len() >= n);
    assert!(off_diag.len() + 1 >= n);

    let mut reflections = 0;
    for k in 0..n {
        // ── Left Householder: zero out a[k+1:m, k] ──
        let tau = reflect_column(a, k);
        if tau != T::zero() {
            reflections += 1;
            // U = U · (I - tau·v·vᵗ)
            for row in 0..m {
                let mut dot = *u.get(row, k);
                for i in (k + 1)..m {
                    dot = dot + *u.get(row, i) * *a.get(i, k);
                }
                dot = dot * tau;
                let uk = *u.get(row, k) - dot;
                u.set(row, k, uk);
                for i in (k + 1)..m {
                    let ui = *u.get(row, i) - dot * *a.get(i, k);
                    u.set(row, i, ui);
                }
            }
        }
        diag[k] = *a.get(k, k);

        // ── Right Householder: zero out a[k, k+2:n] ──
        if k + 2 < n {
            let mut norm_sq = T::zero();
            for j in (k + 1)..n {
                let val = *a.get(k, j);
                norm_sq = norm_sq + val * val;
            }

            if norm_sq > T::zero() {
                let norm = norm_sq.sqrt();
                let alpha = *a.get(k, k + 1);
                let sigma = if alpha < T::zero() { -norm } else { norm };
                let v0 = alpha + sigma;
                let tau = v0 / sigma;

                for j in (k + 2)..n {
                    let val = *a.get(k, j) / v0;
                    a.set(k, j, val);
                }

                // Apply from the right to rows k+1..m
                for i in (k + 1)..m {
                    let mut dot = *a.get(i, k + 1);
                    for j in (k + 2)..n {
                        dot = dot + *a.get(i, j) * *a.get(k, j);
                    }
                    dot = dot * tau;
                    let first = *a.get(i, k + 1) - dot;
                    a.set(i, k + 1, first);
                    for j in (k + 2)..n {
                        let val = *a.get(i, j) - dot * *a.get(k, j);
                        a.set(i, j, val);
                    }
                }

                // V = V · H_R
                for row in 0..n {
                    let mut dot = *v.get(row, k + 1);
                    for j in (k + 2)..n {
                        dot = dot + *v.get(row, j) * *a.get(k, j);
                    }
                    dot = dot * tau;
                    let first = *v.get(row, k + 1) - dot;
                    v.set(row, k + 1, first);
                    for j in (k + 2)..n {
                        let val = *v.get(row, j) - dot * *a.get(k, j);
                        v.set(row, j, val);
                    }
                }

                reflections += 1;
                off_diag[k] = -sigma;
            } else {
                off_diag[k] = *a.get(k, k + 1);
            }
        } else if k + 1 < n {
            off_diag[k] = *a.get(k, k + 1);
        }
    }
    reflections
}

// ── Zero-shift bidiagonal QR ────────────────────────────────────────

/// Drive an upper bidiagonal matrix to diagonal form with zero-shift QR
/// sweeps, folding right rotations into `v` and left rotations into `u`.
///
/// Each sweep starts with the relative convergence test: off-diagonals with
/// `|e_i| ≤ tol·μ_i` or `|e_i| ≤ tol·(|d_i| + |d_{i+1}|)` are set to zero,
/// where `μ₀ = |d₀|` and `μ_{i+1} = |d_{i+1}|·μ_i / (μ_i + |e_i|)`. The
/// trailing unreduced block is then swept. Stops after [`MAX_SWEEPS`]
/// sweeps with a warning.
///
/// Returns the number of sweeps run.
pub(crate) fn diagonalize<T: FloatScalar>(
    diag: &mut [T],
    off_diag: &mut [T],
    u: &mut impl MatrixMut<T>,
    v: &mut impl MatrixMut<T>,
    tol: T,
) -> usize {
    let n = diag.len();
    if n < 2 {
        return 0;
    }
    let zero = T::zero();
    let scale = diag
        .iter()
        .chain(off_diag.iter())
        .fold(zero, |acc, x| acc.max(x.abs()));

    let mut sweeps = 0;
    loop {
        let mut mu = diag[0].abs();
        for i in 0..(n - 1) {
            let ei = off_diag[i].abs();
            if ei <= tol * mu || ei <= tol * (diag[i].abs() + diag[i + 1].abs()) {
                off_diag[i] = zero;
            }
            let denom = mu + off_diag[i].abs();
            mu = if denom > zero {
                diag[i + 1].abs() * (mu / denom)
            } else {
                diag[i + 1].abs()
            };
        }

        // Trailing unreduced block lo..=hi
        let Some(last) = (0..(n - 1)).rev().find(|&i| off_diag[i] != zero) else {
            break;
        };
        let hi = last + 1;
        let mut lo = last;
        while lo > 0 && off_diag[lo - 1] != zero {
            lo -= 1;
        }

        if sweeps == MAX_SWEEPS {
            warn!(
                "svd stopped after {} sweeps, off-diagonal {:?} at {} not converged",
                MAX_SWEEPS, off_diag[last], last
            );
            return sweeps;
        }
        sweeps += 1;

        // A zero on the diagonal decouples the block: chase its
        // off-diagonal entry away with left rotations.
        if let Some(idx) = (lo..hi).find(|&i| diag[i].abs() <= tol * scale) {
            diag[idx] = zero;
            let mut z = off_diag[idx];
            off_diag[idx] = zero;
            for j in (idx + 1)..=hi {
                let (c, s) = givens(diag[j], z);
                diag[j] = c * diag[j] + s * z;
                if j < hi {
                    z = -(s * off_diag[j]);
                    off_diag[j] = c * off_diag[j];
                }
                rotate_cols(u, j, idx, c, s);
            }
            continue;
        }

        let mut x = diag[lo];
        let mut z = off_diag[lo];
        for k in lo..hi {
            // Right rotation on columns k, k+1
            let (c, s) = givens(x, z);
            if k > lo {
                off_diag[k - 1] = c * x + s * z;
            }
            let (dk, ek, dk1) = (diag[k], off_diag[k], diag[k + 1]);
            diag[k] = c * dk + s * ek;
            off_diag[k] = c * ek - s * dk;
            let bulge = s * dk1;
            diag[k + 1] = c * dk1;
            rotate_cols(v, k, k + 1, c, s);

            // Left rotation on rows k, k+1 removes the bulge at (k+1, k)
            let (c2, s2) = givens(diag[k], bulge);
            diag[k] = c2 * diag[k] + s2 * bulge;
            let (ek, dk1) = (off_diag[k], diag[k + 1]);
            off_diag[k] = c2 * ek + s2 * dk1;
            diag[k + 1] = c2 * dk1 - s2 * ek;
            if k + 1 < hi {
                let ek1 = off_diag[k + 1];
                x = off_diag[k];
                z = s2 * ek1;
                off_diag[k + 1] = c2 * ek1;
            }
            rotate_cols(u, k, k + 1, c2, s2);
        }
    }

    debug!("svd converged after {} sweeps", sweeps);
    sweeps
}

/// Make singular values non-negative (flipping `v` columns) and sort them
/// descending, permuting `u` and `v` columns alongside.
fn normalize<T: FloatScalar>(sigma: &mut [T], u: &mut DynMatrix<T>, v: &mut DynMatrix<T>) {
    let n = sigma.len();
    for i in 0..n {
        if sigma[i] < T::zero() {
            sigma[i] = -sigma[i];
            for row in 0..v.nrows() {
                v[(row, i)] = -v[(row, i)];
            }
        }
    }

    for i in 0..n {
        let mut max_idx = i;
        for j in (i + 1)..n {
            if sigma[j] > sigma[max_idx] {
                max_idx = j;
            }
        }
        if max_idx != i {
            sigma.swap(i, max_idx);
            u.swap_cols(i, max_idx);
            v.swap_cols(i, max_idx);
        }
    }
}

/// `m × n` matrix with `sigma` on the diagonal.
fn sigma_matrix<T: FloatScalar>(m: usize, n: usize, sigma: &[T]) -> DynMatrix<T> {
    let mut e = DynMatrix::zeros(m, n);
    for (i, &s) in sigma.iter().enumerate() {
        e[(i, i)] = s;
    }
    if m == n {
        e.set_structure(Structure::Diagonal);
    }
    e
}

#[derive(Debug, Clone)]
struct SvdFactors<T> {
    u: DynMatrix<T>,
    e: DynMatrix<T>,
    v: DynMatrix<T>,
    sigma: Vec<T>,
    /// Square inputs only.
    determinant: Option<T>,
}

impl<T: FloatScalar> SvdFactors<T> {
    /// Full SVD of a tall (or square) matrix.
    fn tall(a: &DynMatrix<T>, tol: T) -> Self {
        let (m, n) = (a.nrows(), a.ncols());
        let mut work = a.clone();
        let mut u = DynMatrix::identity(m);
        let mut v = DynMatrix::identity(n);
        let mut sigma = vec![T::zero(); n];
        let mut off_diag = vec![T::zero(); n.saturating_sub(1)];

        let reflections = bidiagonalize(&mut work, &mut sigma, &mut off_diag, &mut u, &mut v);
        let determinant = (m == n).then(|| {
            let sign = if reflections % 2 == 0 { T::one() } else { -T::one() };
            sigma.iter().fold(sign, |acc, &d| acc * d)
        });

        diagonalize(&mut sigma, &mut off_diag, &mut u, &mut v, tol);
        normalize(&mut sigma, &mut u, &mut v);

        u.set_structure(Structure::Orthogonal);
        v.set_structure(Structure::Orthogonal);
        Self {
            e: sigma_matrix(m, n, &sigma),
            u,
            v,
            sigma,
            determinant,
        }
    }

    fn sigma_max(&self) -> T {
        self.sigma.iter().fold(T::zero(), |acc, &s| acc.max(s))
    }
}

/// Singular value decomposition `M = U·E·Vᵗ`.
///
/// `U` is `m × m` and `V` is `n × n`, both orthogonal; `E` is `m × n` with
/// the non-negative singular values on its diagonal, sorted descending.
/// Wide inputs are decomposed through their transpose.
///
/// Numerical rank counts `σ > max(m, n)·tol·σ_max`; rank deficiency is soft.
/// `tol` is the configured [`Hints`] tolerance rather than `T::epsilon()`:
/// the sweeps stop once off-diagonals fall below `tol` relative to the
/// diagonal, so singular values are only resolved to about `tol·σ_max`.
/// Scaling by `σ_max` instead of the condition number keeps the cutoff finite
/// for exactly singular input.
///
/// # Example
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{Decomposition, Hints, SvdDecomposition};
///
/// let m = DynMatrix::from_rows(2, 3, &[3.0_f64, 2.0, 2.0, 2.0, 3.0, -2.0]);
/// let svd = SvdDecomposition::new(Hints::new(&m));
/// let sigma = svd.singular_values().unwrap();
/// assert!((sigma[0] - 5.0).abs() < 1e-10);
/// assert!((sigma[1] - 3.0).abs() < 1e-10);
/// assert_eq!(svd.rank().unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SvdDecomposition<T> {
    hints: Hints<T>,
    state: SvdState,
    cache: FactorCache<SvdFactors<T>>,
}

impl<T: FloatScalar> SvdDecomposition<T> {
    pub fn new(hints: Hints<T>) -> Self {
        let state = SvdState::from_hints(&hints);
        Self {
            hints,
            state,
            cache: FactorCache::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> SvdState {
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

    fn factors(&self) -> Result<&SvdFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| Ok(self.factorize()))
    }

    fn factorize(&self) -> SvdFactors<T> {
        let m = self.hints.matrix();
        let tol = self.hints.epsilon();
        match self.state {
            SvdState::Orthogonal => {
                let n = m.nrows();
                SvdFactors {
                    u: m.clone(),
                    e: DynMatrix::identity(n),
                    v: DynMatrix::identity(n),
                    sigma: vec![T::one(); n],
                    determinant: None,
                }
            }
            SvdState::Diagonal => {
                let diag = m.diagonal();
                let sigma: Vec<T> = diag.iter().map(|d| d.abs()).collect();
                let signs: Vec<T> = diag
                    .iter()
                    .map(|&d| if d < T::zero() { -T::one() } else { T::one() })
                    .collect();
                SvdFactors {
                    u: DynMatrix::identity(diag.len()),
                    e: DynMatrix::from_diagonal(&sigma),
                    v: DynMatrix::from_diagonal(&signs),
                    determinant: Some(diag.iter().fold(T::one(), |acc, &d| acc * d)),
                    sigma,
                }
            }
            SvdState::Tall => SvdFactors::tall(m, tol),
            SvdState::Wide => {
                let t = SvdFactors::tall(&m.transpose(), tol);
                SvdFactors {
                    u: t.v,
                    e: t.e.transpose(),
                    v: t.u,
                    sigma: t.sigma,
                    determinant: None,
                }
            }
        }
    }

    /// Left singular vectors, `m × m`.
    pub fn u(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.u)
    }

    /// Singular values on the diagonal of an `m × n` matrix.
    pub fn e(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.e)
    }

    /// Right singular vectors, `n × n`.
    pub fn v(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.v)
    }

    /// The `min(m, n)` singular values, as they appear on the diagonal of E.
    pub fn singular_values(&self) -> Result<&[T], LinalgError> {
        Ok(&self.factors()?.sigma)
    }

    /// `σ_max / σ_min` in the 2-norm; infinite when `σ_min` is zero.
    pub fn condition_number(&self) -> Result<T, LinalgError> {
        let f = self.factors()?;
        let min = f.sigma.iter().fold(T::infinity(), |acc, &s| acc.min(s));
        if min == T::zero() {
            return Ok(T::infinity());
        }
        Ok(f.sigma_max() / min)
    }

    /// Singular values at or below this are treated as zero. Uses the hints
    /// tolerance, which also bounds convergence of the sweeps.
    fn threshold(&self, f: &SvdFactors<T>) -> T {
        let m = self.hints.matrix();
        T::from_count(m.nrows().max(m.ncols())) * self.hints.epsilon() * f.sigma_max()
    }
}

impl<T: FloatScalar> Decomposition<T> for SvdDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        require_square("svd solve", self.hints.matrix())?;
        let f = self.factors()?;
        let threshold = self.threshold(f);
        if let Some((index, &s)) = f.sigma.iter().enumerate().find(|&(_, &s)| s <= threshold) {
            return Err(LinalgError::not_invertible(index, s));
        }
        self.approx(b)
    }

    /// `x = V·E⁺·Uᵗ·b`, dropping singular values below the rank threshold.
    fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        let m = self.hints.matrix();
        require_rows("svd approx", b, m.nrows())?;
        let threshold = self.threshold(f);

        let c = f.u.tr_mul(b);
        let mut y = DynMatrix::zeros(m.ncols(), b.ncols());
        for (i, &s) in f.sigma.iter().enumerate() {
            if s > threshold {
                for k in 0..b.ncols() {
                    y[(i, k)] = c[(i, k)] / s;
                }
            }
        }
        Ok(&f.v * &y)
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        let f = self.factors()?;
        let threshold = self.threshold(f);
        Ok(f.sigma.iter().filter(|&&s| s > threshold).count())
    }

    fn determinant(&self) -> Result<T, LinalgError> {
        require_square("svd determinant", self.hints.matrix())?;
        let f = self.factors()?;
        Ok(match f.determinant {
            Some(det) => det,
            None => SvdFactors::tall(self.hints.matrix(), self.hints.epsilon())
                .determinant
                .unwrap_or_else(T::zero),
        })
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("svd inverse", self.hints.matrix())?;
        self.solve(&DynMatrix::identity(n))
    }

    /// `V·E⁺·Uᵗ`, `n × m`.
    fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.approx(&DynMatrix::identity(self.hints.matrix().nrows()))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        self.state = SvdState::from_hints(&self.hints);
    }
}
