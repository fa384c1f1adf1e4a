use crate::dynmatrix::Structure;
use crate::linalg::cache::{CacheState, FactorCache};
use crate::linalg::hints::{Hints, TriangularState};
use crate::linalg::{require_rows, Decomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixRef};
use crate::DynMatrix;

fn check_system<T>(
    op: &'static str,
    a: &impl MatrixRef<T>,
    b: &DynMatrix<T>,
) -> Result<usize, LinalgError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(LinalgError::DimensionMismatch {
            op,
            expected: n,
            got: a.ncols(),
        });
    }
    require_rows(op, b, n)?;
    Ok(n)
}

#[inline]
fn pivot<T: FloatScalar>(a: &impl MatrixRef<T>, i: usize, tol: T) -> Result<T, LinalgError> {
    let d = *a.get(i, i);
    if d.abs() <= tol {
        return Err(LinalgError::not_invertible(i, d));
    }
    Ok(d)
}

/// Solve `L·X = B` by forward substitution, column by column.
///
/// Only the lower triangle of `l` is read. Fails with
/// [`LinalgError::NotInvertible`] if any `|L[i,i]| ≤ tol`.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::forward_substitute;
///
/// let l = DynMatrix::from_rows(2, 2, &[2.0_f64, 0.0, 1.0, 1.0]);
/// let b = DynMatrix::column(&[4.0, 5.0]);
/// let x = forward_substitute(&l, &b, 1e-12).unwrap();
/// assert_eq!(x, DynMatrix::column(&[2.0, 3.0]));
/// ```
pub fn forward_substitute<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &DynMatrix<T>,
    tol: T,
) -> Result<DynMatrix<T>, LinalgError> {
    let n = check_system("forward substitution", l, b)?;
    let mut x = b.clone();
    for i in 0..n {
        let d = pivot(l, i, tol)?;
        for k in 0..b.ncols() {
            let mut sum = x[(i, k)];
            for j in 0..i {
                sum = sum - *l.get(i, j) * x[(j, k)];
            }
            x[(i, k)] = sum / d;
        }
    }
    x.set_structure(Structure::Unknown);
    Ok(x)
}

/// Solve `U·X = B` by backward substitution, column by column.
///
/// Only the upper triangle of `u` is read.
pub fn back_substitute<T: FloatScalar>(
    u: &impl MatrixRef<T>,
    b: &DynMatrix<T>,
    tol: T,
) -> Result<DynMatrix<T>, LinalgError> {
    let n = check_system("back substitution", u, b)?;
    let mut x = b.clone();
    for i in (0..n).rev() {
        let d = pivot(u, i, tol)?;
        for k in 0..b.ncols() {
            let mut sum = x[(i, k)];
            for j in (i + 1)..n {
                sum = sum - *u.get(i, j) * x[(j, k)];
            }
            x[(i, k)] = sum / d;
        }
    }
    x.set_structure(Structure::Unknown);
    Ok(x)
}

/// Solve `D·X = B` for diagonal `D`: `X[i,k] = B[i,k] / D[i,i]`.
pub fn diagonal_substitute<T: FloatScalar>(
    d: &impl MatrixRef<T>,
    b: &DynMatrix<T>,
    tol: T,
) -> Result<DynMatrix<T>, LinalgError> {
    let n = check_system("diagonal substitution", d, b)?;
    let mut x = b.clone();
    for i in 0..n {
        let di = pivot(d, i, tol)?;
        for k in 0..b.ncols() {
            x[(i, k)] = x[(i, k)] / di;
        }
    }
    x.set_structure(Structure::Unknown);
    Ok(x)
}

#[derive(Debug, Clone, Copy)]
struct TriangularFactors<T> {
    determinant: T,
    rank: usize,
}

/// Direct solver for diagonal and triangular matrices.
///
/// Construction fails with [`LinalgError::Structure`] unless the hinted
/// structure is diagonal, lower or upper triangular.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::{Decomposition, Hints, TriangularSolver};
///
/// let u = DynMatrix::from_rows(2, 2, &[1.0_f64, 1.0, 0.0, 1.0]);
/// let solver = TriangularSolver::new(Hints::new(&u)).unwrap();
/// let x = solver.solve(&DynMatrix::column(&[3.0, 1.0])).unwrap();
/// assert_eq!(x, DynMatrix::column(&[2.0, 1.0]));
/// assert_eq!(solver.determinant().unwrap(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct TriangularSolver<T> {
    hints: Hints<T>,
    state: TriangularState,
    cache: FactorCache<TriangularFactors<T>>,
}

impl<T: FloatScalar> TriangularSolver<T> {
    pub fn new(hints: Hints<T>) -> Result<Self, LinalgError> {
        let state = hints.state::<TriangularState>()?;
        Ok(Self {
            hints,
            state,
            cache: FactorCache::new(),
        })
    }

    #[inline]
    pub fn state(&self) -> TriangularState {
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

    fn factors(&self) -> Result<&TriangularFactors<T>, LinalgError> {
        self.cache.get_or_factor(|| {
            let a = self.hints.matrix();
            let tol = self.hints.epsilon();
            let diag = a.diagonal();
            Ok(TriangularFactors {
                determinant: diag.iter().fold(T::one(), |acc, &d| acc * d),
                rank: diag.iter().filter(|d| d.abs() > tol).count(),
            })
        })
    }

    /// Whether every diagonal entry is above the tolerance.
    pub fn is_invertible(&self) -> Result<bool, LinalgError> {
        Ok(self.factors()?.rank == self.hints.matrix().nrows())
    }
}

impl<T: FloatScalar> Decomposition<T> for TriangularSolver<T> {
    fn hints(&self) -> &Hints<T> {
        &self.hints
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        self.factors()?;
        let a = self.hints.matrix();
        let tol = self.hints.epsilon();
        match self.state {
            TriangularState::Diagonal => diagonal_substitute(a, b, tol),
            TriangularState::Lower => forward_substitute(a, b, tol),
            TriangularState::Upper => back_substitute(a, b, tol),
        }
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        Ok(self.factors()?.rank)
    }

    fn determinant(&self) -> Result<T, LinalgError> {
        Ok(self.factors()?.determinant)
    }

    /// Inverse, tagged with the same structure as the input.
    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        let n = self.hints.matrix().nrows();
        let inv = self.solve(&DynMatrix::identity(n))?;
        Ok(inv.with_structure(self.hints.structure()))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
        self.hints.refresh();
        match self.hints.state::<TriangularState>() {
            Ok(state) => self.state = state,
            Err(e) => self.cache.fail(e),
        }
    }
}
