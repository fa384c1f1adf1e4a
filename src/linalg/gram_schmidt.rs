use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, QrState};
use crate::linalg::qr::{least_squares, min_norm};
use crate::linalg::{require_square, Decomposition, LinalgError};
use crate::traits::FloatScalar;
use crate::DynMatrix;

/// Modified Gram-Schmidt on a tall matrix: thin `(Q m×n, R n×n)`.
///
/// A column whose remaining norm is `≤ tol` leaves a zero column in Q and a
/// zero on the diagonal of R.
pub fn gram_schmidt<T: FloatScalar>(a: &DynMatrix<T>, tol: T) -> (DynMatrix<T>, DynMatrix<T>) {
    let (m, n) = (a.nrows(), a.ncols());
    assert!(m >= n, "Gram-Schmidt QR requires M >= N");

    let mut work = a.clone();
    let mut q = DynMatrix::zeros(m, n);
    let mut r = DynMatrix::zeros(n, n);

    for k in 0..n {
        let norm = work.col_norm_from(k, 0);
        if norm <= tol {
            continue;
        }
        r[(k, k)] = norm;
        for i in 0..m {
            q[(i, k)] = work[(i, k)] / norm;
        }
        for j in (k + 1)..n {
            let mut dot = T::zero();
            for i in 0..m {
                dot = dot + q[(i, k)] * work[(i, j)];
            }
            r[(k, j)] = dot;
            for i in 0..m {
                work[(i, j)] = work[(i, j)] - dot * q[(i, k)];
            }
        }
    }
    (q, r.with_structure(Structure::Upper))
}

#[derive(Debug, Clone)]
struct GramSchmidtFactors<T> {
    q: DynMatrix<T>,
    r: DynMatrix<T>,
}

/// QR decomposition by modified Gram-Schmidt, thin factors.
///
/// Tall inputs give `M = Q·R` with `Q` `m × n` (orthonormal columns) and `R`
/// `n × n` upper triangular. Wide inputs give `M = R·Q` with `R` `m × m`
/// lower triangular and `Q` `m × n` (orthonormal rows).
///
/// Provides neither `rank` nor `determinant`; both report
/// [`LinalgError::Unsupported`].
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{GramSchmidtDecomposition, Hints};
///
/// let m = DynMatrix::from_rows(3, 2, &[3.0_f64, 1.0, 4.0, 2.0, 0.0, 5.0]);
/// let gs = GramSchmidtDecomposition::new(Hints::new(&m));
/// let q = gs.q().unwrap();
/// assert!((q[(0, 0)] - 0.6).abs() < 1e-12);
/// assert!((gs.r().unwrap()[(0, 0)] - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct GramSchmidtDecomposition<T> {
    hints: Hints<T>,
    state: QrState,
    cache: FactorCache<GramSchmidtFactors<T>>,
}

impl<T: FloatScalar> GramSchmidtDecomposition<T> {
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

    fn factors(&self) -> Result<&GramSchmidtFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| {
            let m = self.hints.matrix();
            let tol = self.hints.epsilon();
            Ok(match self.state {
                QrState::Orthogonal => GramSchmidtFactors {
                    q: m.clone(),
                    r: DynMatrix::identity(m.ncols()),
                },
                QrState::Upper => GramSchmidtFactors {
                    q: DynMatrix::identity(m.nrows()),
                    r: m.clone(),
                },
                QrState::Tall => {
                    let (q, r) = gram_schmidt(m, tol);
                    GramSchmidtFactors { q, r }
                }
                QrState::Wide => {
                    let (q, r) = gram_schmidt(&m.transpose(), tol);
                    GramSchmidtFactors {
                        q: q.transpose(),
                        r: r.transpose(),
                    }
                }
            })
        })
    }

    /// Orthonormal factor: `m × n` columns (tall) or `m × n` rows (wide).
    pub fn q(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.q)
    }

    /// Square triangular factor: upper (tall) or lower (wide).
    pub fn r(&self) -> Result<&DynMatrix<T>, LinalgError> {
        Ok(&self.factors()?.r)
    }
}

impl<T: FloatScalar> Decomposition<T> for GramSchmidtDecomposition<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        require_square("gram-schmidt solve", self.hints.matrix())?;
        self.approx(b)
    }

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
            method: "gram-schmidt",
        })
    }

    fn determinant(&self) -> Result<T, LinalgError> {
        Err(LinalgError::Unsupported {
            op: "determinant",
            method: "gram-schmidt",
        })
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = require_square("gram-schmidt inverse", self.hints.matrix())?;
        self.solve(&DynMatrix::identity(n))
    }

    fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.approx(&DynMatrix::identity(self.hints.matrix().nrows()))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        self.state = QrState::from_hints(&self.hints);
    }
}
