use crate::traits::FloatScalar;

use super::DynMatrix;

impl<T: FloatScalar> DynMatrix<T> {
    /// Frobenius norm (square root of the sum of squares).
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let m = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
    /// assert!((m.frobenius_norm() - 30.0_f64.sqrt()).abs() < 1e-12);
    /// ```
    pub fn frobenius_norm(&self) -> T {
        self.data
            .iter()
            .fold(T::zero(), |acc, &x| acc + x * x)
            .sqrt()
    }

    /// Infinity norm (maximum absolute row sum).
    pub fn norm_inf(&self) -> T {
        (0..self.nrows)
            .map(|i| (0..self.ncols).fold(T::zero(), |acc, j| acc + self[(i, j)].abs()))
            .fold(T::zero(), T::max)
    }

    /// One norm (maximum absolute column sum).
    pub fn norm_one(&self) -> T {
        (0..self.ncols)
            .map(|j| self.col(j).iter().fold(T::zero(), |acc, &x| acc + x.abs()))
            .fold(T::zero(), T::max)
    }

    /// Largest entry magnitude.
    pub fn max_abs(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()))
    }

    /// Euclidean norm of `column[from..]`.
    pub(crate) fn col_norm_from(&self, col: usize, from: usize) -> T {
        self.col(col)[from..]
            .iter()
            .fold(T::zero(), |acc, &x| acc + x * x)
            .sqrt()
    }
}
