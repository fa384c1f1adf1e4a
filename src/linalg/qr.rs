use alloc::vec;

use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, QrState};
use crate::linalg::triangular::{back_substitute, forward_substitute};
use crate::linalg::{require_rows, require_square, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixMut};
use crate::DynMatrix;

/// Reflect column `col` of `a` below the diagonal and apply the reflection to
/// the trailing columns `col+1..`.
///
/// Writes the scaled Householder vector below the diagonal and the R entry
/// `-sigma` on the diagonal. Returns `tau`, zero when the sub-column is
/// already zero (no reflection).
///
/// The diagonal is perturbed away from zero: `v₀ = a + sign(a)·‖x‖`, so a
/// negative entry subtracts the norm and a non-negative one adds it. The
/// reflected diagonal `R[col, col] = −sign(a)·‖x‖` therefore has the opposite
/// sign of `a`.
pub(crate) fn reflect_column<T: FloatScalar>(a: &mut impl MatrixMut<T>, col: usize) -> T {
    let m = a.nrows();
    let n = a.ncols();

    let mut norm_sq = T::zero();
    for i in col..m {
        let v = *a.get(i, col);
        norm_sq = norm_sq + v * v;
    }
    if norm_sq == T::zero() {
        return T::zero();
    }

    // sigma carries the sign of the diagonal entry so v0 = a + sigma avoids
    // cancellation
    let norm = norm_sq.sqrt();
    let alpha = *a.get(col, col);
    let sigma = if alpha < T::zero() { -norm } else { norm };
    let v0 = alpha + sigma;
    let tau = v0 / sigma;

    for i in (col + 1)..m {
        let v = *a.get(i, col) / v0;
        a.set(i, col, v);
    }

    // A[col:m, j] -= tau * v * (vᵗ A[col:m, j])
    for j in (col + 1)..n {
        let mut dot = *a.get(col, j);
        for i in (col + 1)..m {
            dot = dot + *a.get(i, col) * *a.get(i, j);
        }
        dot = dot * tau;
        let top = *a.get(col, j) - dot;
        a.set(col, j, top);
        for i in (col + 1)..m {
            let v = *a.get(i, j) - dot * *a.get(i, col);
            a.set(i, j, v);
        }
    }

    a.set(col, col, -sigma);
    tau
}

/// QR decomposition in place using Householder reflections (`M ≥ N`).
///
/// On return, `a` holds the packed factorization:
/// - upper triangle (including diagonal): R
/// - strictly lower triangle: Householder vectors scaled so `v[col] = 1`
///
/// `tau` receives the reflection factors (length `N`); a zero entry marks a
/// skipped reflection. Returns the number of reflections applied.
pub fn householder_in_place<T: FloatScalar>(a: &mut impl MatrixMut<T>, tau: &mut [T]) -> usize {
    let n = a.ncols();
    assert!(a.nrows() >= n, "Householder QR requires M >= N");
    assert_eq!(tau.len(), n, "tau length must equal N");

    let mut reflections = 0;
    for col in 0..n {
        tau[col] = reflect_column(a, col);
        if tau[col] != T::zero() {
            reflections += 1;
        }
    }
    reflections
}

/// Accumulate `Q = H₀·H₁·…` from packed reflectors, keeping the first
/// `cols` columns (`M × cols`).
///
/// Reflections are applied in reverse to the leading columns of the identity.
pub(crate) fn accumulate_q<T: FloatScalar>(
    packed: &DynMatrix<T>,
    tau: &[T],
    cols: usize,
) -> DynMatrix<T> {
    let m = packed.nrows();
    let mut q = DynMatrix::zeros(m, cols);
    for i in 0..m.min(cols) {
        q[(i, i)] = T::one();
    }

    for col in (0..tau.len()).rev() {
        let tau_val = tau[col];
        if tau_val == T::zero() {
            continue;
        }
        for j in col..cols {
            let mut dot = q[(col, j)];
            for i in (col + 1)..m {
                dot = dot + packed[(i, col)] * q[(i, j)];
            }
            dot = dot * tau_val;
            q[(col, j)] = q[(col, j)] - dot;
            for i in (col + 1)..m {
                q[(i, j)] = q[(i, j)] - dot * packed[(i, col)];
            }
        }
    }
    q
}

/// Full Householder factors of a tall matrix: `(Q m×m, R m×n, reflections)`.
pub(crate) fn householder_tall<T: FloatScalar>(
    m: &DynMatrix<T>,
) -> (DynMatrix<T>, DynMatrix<T>, usize) {
    let (nr, nc) = (m.nrows(), m.ncols());
    let mut work = m.clone();
    let mut tau = vec![T::zero(); nc];
    let reflections = householder_in_place(&mut work, &mut tau);
    let q = accumulate_q(&work, &tau, nr);
    let r = DynMatrix::from_fn(nr, nc, |i, j| if i <= j { work[(i, j)] } else { T::zero() });
    (q, r, reflections)
}

/// Least-squares solution of a tall system from `M = Q·R`: back-substitute
/// the leading `n × n` block of R against `Qᵗ·b`.
///
/// `q` may be thin (`m × n`) or full (`m × m`).
pub(crate) fn least_squares<T: FloatScalar>(
    q: &DynMatrix<T>,
    r: &DynMatrix<T>,
    b: &DynMatrix<T>,
    tol: T,
) -> Result<DynMatrix<T>, LinalgError> {
    require_rows("least squares", b, q.nrows())?;
    let n = r.ncols();
    let c = q.tr_mul(b);
    back_substitute(&r.block(0, 0, n, n), &c.top_rows(n), tol)
}

/// Minimum-norm solution of a wide system from `M = L·Q` (`L` lower, `Q` with
/// orthonormal rows): `x = Qᵗ·L⁻¹·b`.
pub(crate) fn min_norm<T: FloatScalar>(
    l: &DynMatrix<T>,
    q: &DynMatrix<T>,
    b: &DynMatrix<T>,
    tol: T,
) -> Result<DynMatrix<T>, LinalgError> {
    let m = l.nrows();
    require_rows("minimum-norm solve", b, m)?;
    let y = forward_substitute(&l.block(0, 0, m, m), b, tol)?;
    Ok(q.top_rows(m).tr_mul(&y))
}

#[derive(Debug, Clone)]
struct HouseholderFactors<T> {
    q: DynMatrix<T>,
    r: DynMatrix<T>,
    reflections: usize,
}

/// Householder QR decomposition.
///
/// Tall and square inputs factor as `M = Q·R` with `Q` orthogonal `m × m`
/// and `R` upper trapezoidal `m × n`. Wide inputs factor the transpose and
/// expose `M = R·Q` with `R` lower trapezoidal `m × n` and `Q` orthogonal
/// `n × n`.
///
/// # Example
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{Decomposition, Hints, HouseholderDecomposition};
///
/// // Least-squares fit: y = c0 + c1*x to points (0,1), (1,2), (2,4)
/// let a = DynMatrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let b = DynMatrix::column(&[1.0, 2.0, 4.0]);
/// let x = HouseholderDecomposition::new(Hints::new(&a)).approx(&b).unwrap();
/// assert!((x[(0, 0)] - 5.0 / 6.0).abs() < 1e-10);
/// assert!((x[(1, 0)] - 3.0 / 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct HouseholderDecomposition<T> {
    hints: Hints<T>,
    state: QrState,
    cache: FactorCache<HouseholderFactors<T>>,
}

impl<T: FloatScalar> HouseholderDecomposition<T> {
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

    fn factors(&self) -> Result<&HouseholderFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| Ok(self.factorize()))
    }

    fn factorize(&self) -> HouseholderFactors<T> {
        let m = self.hints.matrix();
        match self.state {
            QrState::Orthogonal => HouseholderFactors {
                q: m.clone().with_structure(Structure::Orthogonal),
                r: DynMatrix::identity(m.ncols()),
                reflections: 0,
            },
            QrState::Upper => HouseholderFactors {
                q: DynMatrix::identity(m.nrows()),
                r: m.clone(),
                reflections: 0,
            },
            QrState::Tall => {
                let (q, mut r, reflections) = householder_tall(m);
                if m.is_square() {
                    r.set_structure(Structure::Upper);
                }
                HouseholderFactors {
                    q: q.with_structure(Structure::Orthogonal),
                    r,
                    reflections,
                }
            }
            QrState::Wide => {
                let (q, r, reflections) = householder_tall(&m.transpose());
                HouseholderFactors {
                    q: q.transpose().with_structure(Structure::Orthogonal),
                    r: r.transpose(),
                    reflections,
                }
            }
        }
    }

    /// Orthogonal factor: `m × m` (tall) or `n × n` (wide).
    pub fn q(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.q)
    }

    /// Triangular factor, `m × n`: upper for tall inputs, lower for wide.
    pub fn r(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.r)
    }

    /// Economy Q: `m × min(m, n)` (tall) or `min(m, n) × n` (wide).
    pub fn q_reduced(&self) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        let k = self.hints.matrix().nrows().min(self.hints.matrix().ncols());
        Ok(match self.state {
            QrState::Wide => f.q.top_rows(k),
            _ => f.q.left_cols(k),
        })
    }

    /// Economy R: square `min(m, n) × min(m, n)`.
    pub fn r_reduced(&self) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        let k = self.hints.matrix().nrows().min(self.hints.matrix().ncols());
        let mut r = f.r.block(0, 0, k, k);
        r.set_structure(match self.state {
            QrState::Wide => Structure::Lower,
            _ => Structure::Upper,
        });
        Ok(r)
    }
}

impl<T: FloatScalar> Decomposition<T> for HouseholderDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        require_square("householder solve", self.hints.matrix())?;
        self.approx(b)
    }

    /// Least squares for tall inputs, minimum norm for wide inputs.
    fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        let f = self.factors()?;
        let tol = self.hints.epsilon();
        match self.state {
            QrState::Wide => min_norm(&f.r, &f.q, b, tol),
            _ => least_squares(&f.q, &f.r, b, tol),
        }
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        Err(LinalgError::Unsupported {
            op: "rank",
            method: "householder",
        })
    }

    /// `(−1)^reflections · ∏ R[i,i]`.
    fn determinant(&self) -> Result<T, LinalgError> {
        require_square("householder determinant", self.hints.matrix())?;
        if self.state == QrState::Orthogonal {
            let (_, r, reflections) = householder_tall(self.hints.matrix());
            return Ok(signed_diagonal_product(&r, reflections));
        }
        let f = self.factors()?;
        Ok(signed_diagonal_product(&f.r, f.reflections))
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("householder inverse", self.hints.matrix())?;
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

/// `(−1)^reflections · ∏ diag(r)`.
pub(crate) fn signed_diagonal_product<T: FloatScalar>(r: &DynMatrix<T>, reflections: usize) -> T {
    let sign = if reflections % 2 == 0 { T::one() } else { -T::one() };
    r.diagonal().iter().fold(sign, |acc, &d| acc * d)
}
