//! Configuration capsule: one source matrix, a tolerance, and the structure
//! the algorithms branch on.

use log::debug;

use crate::dynmatrix::{Shape, Structure};
use crate::linalg::LinalgError;
use crate::traits::FloatScalar;
use crate::DynMatrix;

/// Numerical tolerance used for pivot, deflation and detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance<T> {
    /// Multiple of the machine epsilon of `T`.
    Ulps(u32),
    /// Absolute threshold.
    Absolute(T),
}

impl<T> Default for Tolerance<T> {
    /// 128 ulps: 2⁻¹⁶ for `f32`.
    fn default() -> Self {
        Tolerance::Ulps(128)
    }
}

impl<T: FloatScalar> Tolerance<T> {
    /// Threshold value for `T`.
    ///
    /// ```
    /// use densolve::linalg::Tolerance;
    /// assert_eq!(Tolerance::<f32>::default().resolve(), 2.0_f32.powi(-16));
    /// assert_eq!(Tolerance::Absolute(1e-3_f64).resolve(), 1e-3);
    /// ```
    pub fn resolve(self) -> T {
        match self {
            Tolerance::Ulps(n) => T::epsilon() * T::from_count(n as usize),
            Tolerance::Absolute(tol) => tol.abs(),
        }
    }
}

/// Source matrix plus the tolerance and structure every decomposition reads.
///
/// `Hints` owns a copy of the matrix, so the caller's matrix can be reused
/// freely. The structure is the matrix's declared tag, or the result of
/// [`Structure::detect`] when the tag is [`Structure::Unknown`].
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::dynmatrix::Structure;
/// use densolve::linalg::{Hints, LuState};
///
/// let m = DynMatrix::from_rows(2, 2, &[2.0_f64, 0.0, 1.0, 3.0]);
/// let hints = Hints::new(&m);
/// assert_eq!(hints.structure(), Structure::Lower);
/// assert_eq!(hints.state::<LuState>().unwrap(), LuState::Lower);
/// ```
#[derive(Debug, Clone)]
pub struct Hints<T> {
    matrix: DynMatrix<T>,
    epsilon: T,
    structure: Structure,
}

impl<T: FloatScalar> Hints<T> {
    /// Hints with the default tolerance.
    pub fn new(m: &DynMatrix<T>) -> Self {
        Self::with_tolerance(m, Tolerance::default())
    }

    pub fn with_tolerance(m: &DynMatrix<T>, tolerance: Tolerance<T>) -> Self {
        let epsilon = tolerance.resolve();
        let structure = resolve_structure(m, epsilon);
        Self {
            matrix: m.clone(),
            epsilon,
            structure,
        }
    }

    #[inline]
    pub fn matrix(&self) -> &DynMatrix<T> {
        &self.matrix
    }

    /// Resolved tolerance.
    #[inline]
    pub fn epsilon(&self) -> T {
        self.epsilon
    }

    /// Declared structure, or the detected one when undeclared.
    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }

    /// Structure declared on the source matrix, before detection.
    #[inline]
    pub fn declared(&self) -> Structure {
        self.matrix.structure()
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.matrix.shape()
    }

    /// Derive the algorithm state for decomposition family `S`.
    pub fn state<S: AlgorithmState>(&self) -> Result<S, LinalgError> {
        S::classify(self)
    }

    /// Mutable access to the source. Nothing is re-derived until
    /// [`Hints::refresh`] runs.
    pub(crate) fn matrix_mut(&mut self) -> &mut DynMatrix<T> {
        &mut self.matrix
    }

    /// Re-resolve the structure after the source was edited.
    pub(crate) fn refresh(&mut self) {
        self.structure = resolve_structure(&self.matrix, self.epsilon);
    }
}

fn resolve_structure<T: FloatScalar>(m: &DynMatrix<T>, epsilon: T) -> Structure {
    let declared = m.structure();
    let is_square = m.is_square();
    match declared {
        Structure::Unknown => {
            let detected = Structure::detect(m, epsilon);
            debug!(
                "no declared structure on {}x{} matrix, detected {:?}",
                m.nrows(),
                m.ncols(),
                detected
            );
            detected
        }
        Structure::General => {
            if is_square {
                Structure::Square
            } else {
                Structure::General
            }
        }
        tag if !is_square => {
            debug!(
                "ignoring {:?} tag on non-square {}x{} matrix",
                tag,
                m.nrows(),
                m.ncols()
            );
            Structure::General
        }
        tag => tag,
    }
}

/// Per-family classification of a matrix into the code path that handles it.
pub trait AlgorithmState: Sized + Copy {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError>;
}

fn square_dim<T: FloatScalar>(op: &'static str, hints: &Hints<T>) -> Result<(), LinalgError> {
    crate::linalg::require_square(op, hints.matrix()).map(|_| ())
}

/// Code paths of the triangular solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangularState {
    Diagonal,
    Lower,
    Upper,
}

impl AlgorithmState for TriangularState {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError> {
        square_dim("triangular solve", hints)?;
        match hints.structure() {
            Structure::Diagonal => Ok(TriangularState::Diagonal),
            Structure::Lower => Ok(TriangularState::Lower),
            Structure::Upper => Ok(TriangularState::Upper),
            _ => Err(LinalgError::Structure {
                op: "triangular solve",
                required: "diagonal or triangular",
            }),
        }
    }
}

/// Code paths of the LU family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuState {
    Diagonal,
    Lower,
    Upper,
    Generic,
}

impl LuState {
    /// Total: every structure has an LU code path.
    pub(crate) fn from_structure(structure: Structure) -> Self {
        match structure {
            Structure::Diagonal => LuState::Diagonal,
            Structure::Lower => LuState::Lower,
            Structure::Upper => LuState::Upper,
            _ => LuState::Generic,
        }
    }
}

impl AlgorithmState for LuState {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError> {
        Ok(LuState::from_structure(hints.structure()))
    }
}

/// Code paths of the Cholesky factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CholeskyState {
    Diagonal,
    Symmetric,
}

impl AlgorithmState for CholeskyState {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError> {
        square_dim("cholesky", hints)?;
        match hints.structure() {
            Structure::Diagonal => Ok(CholeskyState::Diagonal),
            Structure::Symmetric => Ok(CholeskyState::Symmetric),
            _ => Err(LinalgError::Structure {
                op: "cholesky",
                required: "symmetric",
            }),
        }
    }
}

/// Code paths of the QR family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrState {
    /// Square orthogonal input: `Q = M`, `R = I`.
    Orthogonal,
    /// Square upper-triangular input: `Q = I`, `R = M`.
    Upper,
    /// `rows ≥ cols`: QR.
    Tall,
    /// `rows < cols`: LQ of the transpose.
    Wide,
}

impl QrState {
    /// Total: every matrix has a QR code path.
    pub(crate) fn from_hints<T: FloatScalar>(hints: &Hints<T>) -> Self {
        match (hints.structure(), hints.shape()) {
            (Structure::Orthogonal, Shape::Square) => QrState::Orthogonal,
            (Structure::Upper | Structure::Diagonal, Shape::Square) => QrState::Upper,
            (_, Shape::Wide) => QrState::Wide,
            _ => QrState::Tall,
        }
    }
}

impl AlgorithmState for QrState {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError> {
        Ok(QrState::from_hints(hints))
    }
}

/// Code paths of the SVD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdState {
    Orthogonal,
    Diagonal,
    Tall,
    Wide,
}

impl SvdState {
    pub(crate) fn from_hints<T: FloatScalar>(hints: &Hints<T>) -> Self {
        match (hints.structure(), hints.shape()) {
            (Structure::Orthogonal, Shape::Square) => SvdState::Orthogonal,
            (Structure::Diagonal, Shape::Square) => SvdState::Diagonal,
            (_, Shape::Wide) => SvdState::Wide,
            _ => SvdState::Tall,
        }
    }
}

impl AlgorithmState for SvdState {
    fn classify<T: FloatScalar>(hints: &Hints<T>) -> Result<Self, LinalgError> {
        Ok(SvdState::from_hints(hints))
    }
}
