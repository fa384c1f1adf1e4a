//! Facade that picks a decomposition from the structure of the matrix.

use crate::dynmatrix::{Shape, Structure};
use crate::linalg::{
    CholeskyDecomposition, CroutDecomposition, Decomposition, GaussDecomposition,
    GramSchmidtDecomposition, Hints, HouseholderDecomposition, LinalgError, RankRevealingQr,
    SvdDecomposition, TriangularSolver,
};
use crate::traits::FloatScalar;
use crate::DynMatrix;

/// Decomposition requested from [`Solver::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Choose from the structure and shape of the matrix.
    #[default]
    Auto,
    Triangular,
    Gauss,
    Crout,
    Cholesky,
    Householder,
    GramSchmidt,
    RankRevealing,
    Svd,
}

impl Method {
    /// The method [`Method::Auto`] resolves to for `hints`:
    ///
    /// | Structure / shape | Method |
    /// |---|---|
    /// | diagonal, lower, upper | `Triangular` |
    /// | declared symmetric | `Cholesky` |
    /// | orthogonal | `RankRevealing` |
    /// | other square | `Gauss` |
    /// | tall or wide | `RankRevealing` |
    ///
    /// Every resolved method answers all [`Decomposition`] operations its
    /// shape allows, `rank` included.
    pub fn resolve<T: FloatScalar>(self, hints: &Hints<T>) -> Method {
        if self != Method::Auto {
            return self;
        }
        match (hints.structure(), hints.shape()) {
            (Structure::Diagonal | Structure::Lower | Structure::Upper, _) => Method::Triangular,
            (Structure::Symmetric, _) if hints.declared() == Structure::Symmetric => {
                Method::Cholesky
            }
            (Structure::Orthogonal, _) => Method::RankRevealing,
            (_, Shape::Square) => Method::Gauss,
            _ => Method::RankRevealing,
        }
    }
}

/// One decomposition behind the [`Decomposition`] interface.
///
/// ```
/// use densolve::{DynMatrix, Method, Solver};
/// use densolve::linalg::{Decomposition, Hints};
///
/// let u = DynMatrix::from_rows(2, 2, &[1.0_f64, 1.0, 0.0, 1.0]);
/// let solver = Solver::new(Hints::new(&u), Method::Auto).unwrap();
/// assert_eq!(solver.method(), Method::Triangular);
/// let x = solver.solve(&DynMatrix::column(&[3.0, 1.0])).unwrap();
/// assert_eq!(x, DynMatrix::column(&[2.0, 1.0]));
/// ```
#[derive(Debug, Clone)]
pub enum Solver<T> {
    Triangular(TriangularSolver<T>),
    Gauss(GaussDecomposition<T>),
    Crout(CroutDecomposition<T>),
    Cholesky(CholeskyDecomposition<T>),
    Householder(HouseholderDecomposition<T>),
    GramSchmidt(GramSchmidtDecomposition<T>),
    RankRevealing(RankRevealingQr<T>),
    Svd(SvdDecomposition<T>),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Solver::Triangular($d) => $body,
            Solver::Gauss($d) => $body,
            Solver::Crout($d) => $body,
            Solver::Cholesky($d) => $body,
            Solver::Householder($d) => $body,
            Solver::GramSchmidt($d) => $body,
            Solver::RankRevealing($d) => $body,
            Solver::Svd($d) => $body,
        }
    };
}

impl<T: FloatScalar> Solver<T> {
    /// Build the decomposition `method` resolves to.
    ///
    /// Fails when the chosen decomposition rejects the matrix: triangular
    /// and Cholesky on the wrong structure, Crout and Cholesky on non-square
    /// input.
    pub fn new(hints: Hints<T>, method: Method) -> Result<Self, LinalgError> {
        Ok(match method.resolve(&hints) {
            Method::Triangular => Solver::Triangular(TriangularSolver::new(hints)?),
            Method::Crout => Solver::Crout(CroutDecomposition::new(hints)?),
            Method::Cholesky => Solver::Cholesky(CholeskyDecomposition::new(hints)?),
            Method::Householder => Solver::Householder(HouseholderDecomposition::new(hints)),
            Method::GramSchmidt => Solver::GramSchmidt(GramSchmidtDecomposition::new(hints)),
            Method::RankRevealing => Solver::RankRevealing(RankRevealingQr::new(hints)),
            Method::Svd => Solver::Svd(SvdDecomposition::new(hints)),
            Method::Gauss | Method::Auto => Solver::Gauss(GaussDecomposition::new(hints)),
        })
    }

    /// The concrete method behind this solver.
    pub fn method(&self) -> Method {
        match self {
            Solver::Triangular(_) => Method::Triangular,
            Solver::Gauss(_) => Method::Gauss,
            Solver::Crout(_) => Method::Crout,
            Solver::Cholesky(_) => Method::Cholesky,
            Solver::Householder(_) => Method::Householder,
            Solver::GramSchmidt(_) => Method::GramSchmidt,
            Solver::RankRevealing(_) => Method::RankRevealing,
            Solver::Svd(_) => Method::Svd,
        }
    }
}

impl<T: FloatScalar> Decomposition<T> for Solver<T> {
    fn hints(&self) -> &Hints<T> {
        dispatch!(self, d => d.hints())
    }

    fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        dispatch!(self, d => d.solve(b))
    }

    fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        dispatch!(self, d => d.approx(b))
    }

    fn rank(&self) -> Result<usize, LinalgError> {
        dispatch!(self, d => d.rank())
    }

    fn determinant(&self) -> Result<T, LinalgError> {
        dispatch!(self, d => d.determinant())
    }

    fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        dispatch!(self, d => d.inverse())
    }

    fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        dispatch!(self, d => d.pseudoinverse())
    }

    fn invalidate(&mut self) {
        dispatch!(self, d => d.invalidate())
    }
}

// ── DynMatrix convenience methods ───────────────────────────────────

impl<T: FloatScalar> DynMatrix<T> {
    fn auto(&self) -> Result<Solver<T>, LinalgError> {
        Solver::new(Hints::new(self), Method::Auto)
    }

    /// Solve `self · x = b` with the automatically chosen decomposition.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let a = DynMatrix::from_rows(2, 2, &[2.0_f64, 1.0, 1.0, 3.0]);
    /// let x = a.solve(&DynMatrix::column(&[5.0, 10.0])).unwrap();
    /// assert!((x[(0, 0)] - 1.0).abs() < 1e-12);
    /// assert!((x[(1, 0)] - 3.0).abs() < 1e-12);
    /// ```
    pub fn solve(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        self.auto()?.solve(b)
    }

    /// Least-squares (tall) or minimum-norm (wide) solution of `self · x ≈ b`.
    pub fn approx(&self, b: &DynMatrix<T>) -> Result<DynMatrix<T>, LinalgError> {
        self.auto()?.approx(b)
    }

    /// Numerical rank from the singular values.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let a = DynMatrix::from_rows(3, 2, &[1.0_f64, 2.0, 2.0, 4.0, 3.0, 6.0]);
    /// assert_eq!(a.rank().unwrap(), 1);
    /// ```
    pub fn rank(&self) -> Result<usize, LinalgError> {
        self.svd().rank()
    }

    /// Determinant of a square matrix.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let a = DynMatrix::from_rows(2, 2, &[4.0_f64, 3.0, 6.0, 3.0]);
    /// assert!((a.determinant().unwrap() + 6.0).abs() < 1e-12);
    /// ```
    pub fn determinant(&self) -> Result<T, LinalgError> {
        self.auto()?.determinant()
    }

    pub fn inverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.auto()?.inverse()
    }

    /// Moore–Penrose inverse: the inverse for square input, the least-squares
    /// or minimum-norm inverse for full-rank rectangular input.
    pub fn pseudoinverse(&self) -> Result<DynMatrix<T>, LinalgError> {
        self.auto()?.pseudoinverse()
    }

    /// LU decomposition with full pivoting.
    pub fn gauss(&self) -> GaussDecomposition<T> {
        GaussDecomposition::new(Hints::new(self))
    }

    /// Crout LU decomposition with partial pivoting (square only).
    pub fn crout(&self) -> Result<CroutDecomposition<T>, LinalgError> {
        CroutDecomposition::new(Hints::new(self))
    }

    /// Cholesky decomposition (symmetric or diagonal only).
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// use densolve::dynmatrix::Structure;
    ///
    /// let a = DynMatrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0])
    ///     .with_structure(Structure::Symmetric);
    /// let chol = a.cholesky().unwrap();
    /// let r = chol.r().unwrap();
    /// assert!((r[(0, 0)] - 2.0).abs() < 1e-12);
    /// ```
    pub fn cholesky(&self) -> Result<CholeskyDecomposition<T>, LinalgError> {
        CholeskyDecomposition::new(Hints::new(self))
    }

    /// Householder QR (LQ for wide matrices).
    pub fn householder(&self) -> HouseholderDecomposition<T> {
        HouseholderDecomposition::new(Hints::new(self))
    }

    /// Modified Gram-Schmidt QR (LQ for wide matrices).
    pub fn gram_schmidt(&self) -> GramSchmidtDecomposition<T> {
        GramSchmidtDecomposition::new(Hints::new(self))
    }

    /// Rank-revealing Householder QR with column pivoting.
    pub fn rrqr(&self) -> RankRevealingQr<T> {
        RankRevealingQr::new(Hints::new(self))
    }

    /// Singular value decomposition.
    pub fn svd(&self) -> SvdDecomposition<T> {
        SvdDecomposition::new(Hints::new(self))
    }
}
