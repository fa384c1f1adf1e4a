use alloc::vec::Vec;

use crate::dynmatrix::Structure;
use crate::traits::Scalar;
use crate::DynMatrix;

/// Row or column permutation recorded during pivoting.
///
/// `indices()[i]` is the original index now sitting at position `i`. As a
/// matrix this is `P` with `P[i, indices[i]] = 1`, so `P·M` gathers the rows
/// of `M` in pivot order.
///
/// ```
/// use densolve::DynMatrix;
/// use densolve::linalg::Permutation;
///
/// let mut p = Permutation::identity(3);
/// p.swap(0, 2);
/// assert_eq!(p.indices(), &[2, 1, 0]);
/// assert!(!p.is_identity());
///
/// let m = DynMatrix::from_rows(3, 1, &[1.0_f64, 2.0, 3.0]);
/// assert_eq!(p.permute_rows(&m), p.to_matrix() * &m);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    indices: Vec<usize>,
    odd: bool,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
            odd: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Exchange positions `a` and `b`. A real exchange flips the parity.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a != b {
            self.indices.swap(a, b);
            self.odd = !self.odd;
        }
    }

    /// Strict check against `0..n`.
    pub fn is_identity(&self) -> bool {
        self.indices.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// `+1` for an even number of swaps, `-1` for odd.
    pub fn sign<T: Scalar>(&self) -> T {
        if self.odd {
            T::zero() - T::one()
        } else {
            T::one()
        }
    }

    /// Materialize `P`. The identity is tagged `Diagonal`, anything else
    /// `Orthogonal`.
    pub fn to_matrix<T: Scalar>(&self) -> DynMatrix<T> {
        let n = self.len();
        if self.is_identity() {
            return DynMatrix::identity(n);
        }
        let mut p = DynMatrix::zeros(n, n);
        for (i, &src) in self.indices.iter().enumerate() {
            p[(i, src)] = T::one();
        }
        p.with_structure(Structure::Orthogonal)
    }

    /// `P·m`: row `i` of the result is row `indices[i]` of `m`.
    pub fn permute_rows<T: Scalar>(&self, m: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.len(), m.nrows(), "permutation length must match row count");
        DynMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(self.indices[i], j)])
    }

    /// `Pᵗ·m`: row `indices[i]` of the result is row `i` of `m`.
    pub fn unpermute_rows<T: Scalar>(&self, m: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.len(), m.nrows(), "permutation length must match row count");
        let mut out = DynMatrix::zeros(m.nrows(), m.ncols());
        for (i, &dst) in self.indices.iter().enumerate() {
            for j in 0..m.ncols() {
                out[(dst, j)] = m[(i, j)];
            }
        }
        out
    }

    /// `m·Pᵗ`: column `j` of the result is column `indices[j]` of `m`.
    pub fn permute_cols<T: Scalar>(&self, m: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(self.len(), m.ncols(), "permutation length must match column count");
        DynMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, self.indices[j])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity() {
        let p = Permutation::identity(4);
        assert!(p.is_identity());
        assert_eq!(p.sign::<f64>(), 1.0);
        let m: DynMatrix<f64> = p.to_matrix();
        assert_eq!(m, DynMatrix::identity(4));
        assert_eq!(m.structure(), Structure::Diagonal);
    }

    #[test]
    fn swap_parity() {
        let mut p = Permutation::identity(3);
        p.swap(0, 1);
        assert_eq!(p.sign::<f64>(), -1.0);
        p.swap(1, 1);
        assert_eq!(p.sign::<f64>(), -1.0);
        p.swap(1, 2);
        assert_eq!(p.sign::<f64>(), 1.0);
        assert_eq!(p.indices(), &[1, 2, 0]);
    }

    #[test]
    fn double_swap_returns_to_identity() {
        let mut p = Permutation::identity(3);
        p.swap(0, 2);
        p.swap(0, 2);
        assert!(p.is_identity());
    }

    #[test]
    fn apply_matches_matrix() {
        let mut p = Permutation::identity(3);
        p.swap(0, 2);
        p.swap(1, 2);
        let m = DynMatrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let pm: DynMatrix<f64> = p.to_matrix();
        assert_eq!(pm.structure(), Structure::Orthogonal);
        assert_eq!(p.permute_rows(&m), &pm * &m);
        assert_eq!(p.unpermute_rows(&m), pm.transpose() * &m);
        assert_eq!(p.permute_cols(&m), &m * pm.transpose());
        assert_eq!(p.unpermute_rows(&p.permute_rows(&m)), m);
    }
}
