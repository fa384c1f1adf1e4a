use crate::traits::{FloatScalar, MatrixRef};

/// Structural tag carried alongside a matrix.
///
/// The tag is a hint that selects fast paths inside the decompositions. It is
/// never enforced: a matrix tagged [`Structure::Upper`] is treated as upper
/// triangular and its strictly lower part is ignored. [`Structure::Unknown`]
/// asks the consumer to run [`Structure::detect`] instead.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::dynmatrix::Structure;
///
/// let m = DynMatrix::from_rows(2, 2, &[1.0_f64, 1.0, 0.0, 1.0]);
/// assert_eq!(Structure::detect(&m, 1e-12), Structure::Upper);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Structure {
    /// No declared structure; consumers fall back to numerical detection.
    #[default]
    Unknown,
    /// Rectangular matrix with no exploitable structure.
    General,
    /// Square matrix with no exploitable structure.
    Square,
    Symmetric,
    Diagonal,
    /// Lower triangular (square).
    Lower,
    /// Upper triangular (square).
    Upper,
    /// Square with orthonormal columns.
    Orthogonal,
}

impl Structure {
    /// Re-derive the structure of `m` by inspecting its entries.
    ///
    /// Square matrices are tested in the order diagonal, lower, upper,
    /// symmetric, orthogonal; the first match wins. Non-square matrices are
    /// always [`Structure::General`].
    ///
    /// The zero pattern and symmetry are compared exactly; `tol` only bounds
    /// the orthonormality residual `|MᵗM − I|`.
    pub fn detect<T: FloatScalar>(m: &impl MatrixRef<T>, tol: T) -> Structure {
        let n = m.nrows();
        if n != m.ncols() {
            return Structure::General;
        }

        let mut upper_zero = true;
        let mut lower_zero = true;
        for j in 0..n {
            for i in 0..n {
                if i == j || *m.get(i, j) == T::zero() {
                    continue;
                }
                if i < j {
                    upper_zero = false;
                } else {
                    lower_zero = false;
                }
            }
        }

        match (lower_zero, upper_zero) {
            (true, true) => return Structure::Diagonal,
            (false, true) => return Structure::Lower,
            (true, false) => return Structure::Upper,
            (false, false) => {}
        }

        let symmetric = (0..n).all(|i| {
            ((i + 1)..n).all(|j| *m.get(i, j) == *m.get(j, i))
        });
        if symmetric {
            return Structure::Symmetric;
        }

        if is_orthogonal(m, tol) {
            return Structure::Orthogonal;
        }

        Structure::Square
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self == Structure::Diagonal
    }

    /// Lower triangular, including diagonal.
    #[inline]
    pub fn is_lower(self) -> bool {
        matches!(self, Structure::Lower | Structure::Diagonal)
    }

    /// Upper triangular, including diagonal.
    #[inline]
    pub fn is_upper(self) -> bool {
        matches!(self, Structure::Upper | Structure::Diagonal)
    }

    #[inline]
    pub fn is_symmetric(self) -> bool {
        matches!(self, Structure::Symmetric | Structure::Diagonal)
    }

    /// Tag of the transposed matrix.
    #[inline]
    pub fn transposed(self) -> Structure {
        match self {
            Structure::Lower => Structure::Upper,
            Structure::Upper => Structure::Lower,
            other => other,
        }
    }
}

/// Columns are orthonormal: `MᵗM ≈ I` entry-wise within `tol`.
fn is_orthogonal<T: FloatScalar>(m: &impl MatrixRef<T>, tol: T) -> bool {
    let n = m.ncols();
    for a in 0..n {
        for b in a..n {
            let mut dot = T::zero();
            for i in 0..m.nrows() {
                dot = dot + *m.get(i, a) * *m.get(i, b);
            }
            let expected = if a == b { T::one() } else { T::zero() };
            if (dot - expected).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Orientation of a matrix, derived from its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Square,
    /// More rows than columns.
    Tall,
    /// More columns than rows.
    Wide,
}

impl Shape {
    #[inline]
    pub fn of(nrows: usize, ncols: usize) -> Shape {
        match nrows.cmp(&ncols) {
            core::cmp::Ordering::Equal => Shape::Square,
            core::cmp::Ordering::Greater => Shape::Tall,
            core::cmp::Ordering::Less => Shape::Wide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynMatrix;

    const TOL: f64 = 1e-12;

    #[test]
    fn detect_diagonal() {
        let m = DynMatrix::from_rows(2, 2, &[4.0, 0.0, 0.0, 9.0]);
        assert_eq!(Structure::detect(&m, TOL), Structure::Diagonal);
    }

    #[test]
    fn detect_triangular() {
        let lower = DynMatrix::from_rows(2, 2, &[1.0, 0.0, 2.0, 3.0]);
        let upper = DynMatrix::from_rows(2, 2, &[1.0, 2.0, 0.0, 3.0]);
        assert_eq!(Structure::detect(&lower, TOL), Structure::Lower);
        assert_eq!(Structure::detect(&upper, TOL), Structure::Upper);
    }

    #[test]
    fn detect_symmetric() {
        let m = DynMatrix::from_rows(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        assert_eq!(Structure::detect(&m, TOL), Structure::Symmetric);
    }

    #[test]
    fn detect_orthogonal() {
        // 90° rotation
        let m = DynMatrix::from_rows(2, 2, &[0.0, -1.0, 1.0, 0.0]);
        assert_eq!(Structure::detect(&m, TOL), Structure::Orthogonal);
    }

    #[test]
    fn detect_square_and_general() {
        let sq = DynMatrix::from_rows(2, 2, &[4.0, 3.0, 6.0, 3.0]);
        assert_eq!(Structure::detect(&sq, TOL), Structure::Square);
        let rect = DynMatrix::from_rows(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(Structure::detect(&rect, TOL), Structure::General);
    }

    #[test]
    fn small_off_diagonals_are_not_zero() {
        let m = DynMatrix::from_rows(2, 2, &[1.0, 1e-9, 0.0, 1.0]);
        assert_eq!(Structure::detect(&m, 1e-6), Structure::Upper);

        let m = DynMatrix::from_rows(2, 2, &[1.0_f32, 1e-5, 1e-5, 2e-5]);
        assert_eq!(Structure::detect(&m, 1.0 / 65536.0), Structure::Symmetric);

        let m = DynMatrix::from_rows(2, 2, &[4.0, 2.0, 2.0 + 1e-12, 3.0]);
        assert_eq!(Structure::detect(&m, 1e-6), Structure::Square);
    }

    #[test]
    fn orthogonality_uses_tolerance() {
        let c = 0.6_f64;
        let s = 0.8 + 1e-9;
        let m = DynMatrix::from_rows(2, 2, &[c, -s, s, c]);
        assert_eq!(Structure::detect(&m, 1e-6), Structure::Orthogonal);
        assert_eq!(Structure::detect(&m, TOL), Structure::Square);
    }

    #[test]
    fn transposed_tag() {
        assert_eq!(Structure::Lower.transposed(), Structure::Upper);
        assert_eq!(Structure::Symmetric.transposed(), Structure::Symmetric);
    }

    #[test]
    fn shape_of() {
        assert_eq!(Shape::of(3, 3), Shape::Square);
        assert_eq!(Shape::of(4, 2), Shape::Tall);
        assert_eq!(Shape::of(2, 4), Shape::Wide);
    }
}
