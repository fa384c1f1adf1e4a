use alloc::vec;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::traits::Scalar;

use super::{DynMatrix, Structure};

// ── Element-wise addition / subtraction ─────────────────────────────

macro_rules! impl_elementwise {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt, $sym:literal) => {
        impl<T: Scalar> $trait<&DynMatrix<T>> for &DynMatrix<T> {
            type Output = DynMatrix<T>;

            fn $method(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
                assert_eq!(
                    (self.nrows, self.ncols),
                    (rhs.nrows, rhs.ncols),
                    concat!("dimension mismatch: {}x{} ", $sym, " {}x{}"),
                    self.nrows, self.ncols, rhs.nrows, rhs.ncols,
                );
                let data = self
                    .data
                    .iter()
                    .zip(rhs.data.iter())
                    .map(|(&a, &b)| a $op b)
                    .collect();
                DynMatrix::from_vec(self.nrows, self.ncols, data)
            }
        }

        impl<T: Scalar> $trait for DynMatrix<T> {
            type Output = DynMatrix<T>;
            fn $method(self, rhs: DynMatrix<T>) -> DynMatrix<T> {
                (&self).$method(&rhs)
            }
        }

        impl<T: Scalar> $trait<&DynMatrix<T>> for DynMatrix<T> {
            type Output = DynMatrix<T>;
            fn $method(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
                (&self).$method(rhs)
            }
        }

        impl<T: Scalar> $trait<DynMatrix<T>> for &DynMatrix<T> {
            type Output = DynMatrix<T>;
            fn $method(self, rhs: DynMatrix<T>) -> DynMatrix<T> {
                self.$method(&rhs)
            }
        }

        impl<T: Scalar> $assign_trait<&DynMatrix<T>> for DynMatrix<T> {
            fn $assign_method(&mut self, rhs: &DynMatrix<T>) {
                assert_eq!(
                    (self.nrows, self.ncols),
                    (rhs.nrows, rhs.ncols),
                    concat!("dimension mismatch: {}x{} ", $sym, "= {}x{}"),
                    self.nrows, self.ncols, rhs.nrows, rhs.ncols,
                );
                for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
                    *a = *a $op b;
                }
                self.structure = Structure::Unknown;
            }
        }
    };
}

impl_elementwise!(Add, add, AddAssign, add_assign, +, "+");
impl_elementwise!(Sub, sub, SubAssign, sub_assign, -, "-");

// ── Negation ────────────────────────────────────────────────────────

impl<T: Scalar> Neg for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn neg(self) -> DynMatrix<T> {
        let data = self.data.iter().map(|&x| T::zero() - x).collect();
        DynMatrix::from_vec(self.nrows, self.ncols, data)
    }
}

impl<T: Scalar> Neg for DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn neg(self) -> DynMatrix<T> {
        -&self
    }
}

// ── Matrix multiplication: (M×N) * (N×P) → (M×P) ──────────────────

impl<T: Scalar> Mul<&DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn mul(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let m = self.nrows;
        let n = self.ncols;
        let p = rhs.ncols;
        let mut data = vec![T::zero(); m * p];
        // j-k-i order walks both operands down their columns
        for j in 0..p {
            for k in 0..n {
                let b_kj = rhs.data[j * n + k];
                if b_kj == T::zero() {
                    continue;
                }
                let a_col = &self.data[k * m..(k + 1) * m];
                let c_col = &mut data[j * m..(j + 1) * m];
                for (c, &a) in c_col.iter_mut().zip(a_col) {
                    *c = *c + a * b_kj;
                }
            }
        }
        DynMatrix::from_vec(m, p, data)
    }
}

impl<T: Scalar> Mul for DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn mul(self, rhs: DynMatrix<T>) -> DynMatrix<T> {
        &self * &rhs
    }
}

impl<T: Scalar> Mul<&DynMatrix<T>> for DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn mul(self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        &self * rhs
    }
}

impl<T: Scalar> Mul<DynMatrix<T>> for &DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn mul(self, rhs: DynMatrix<T>) -> DynMatrix<T> {
        self * &rhs
    }
}

// ── Scalar multiplication / division ────────────────────────────────

impl<T: Scalar> Mul<T> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn mul(self, rhs: T) -> DynMatrix<T> {
        let data = self.data.iter().map(|&x| x * rhs).collect();
        DynMatrix::from_vec(self.nrows, self.ncols, data)
    }
}

impl<T: Scalar> Mul<T> for DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn mul(self, rhs: T) -> DynMatrix<T> {
        &self * rhs
    }
}

impl<T: Scalar> MulAssign<T> for DynMatrix<T> {
    fn mul_assign(&mut self, rhs: T) {
        for x in self.data.iter_mut() {
            *x = *x * rhs;
        }
        self.structure = Structure::Unknown;
    }
}

impl<T: Scalar> Div<T> for &DynMatrix<T> {
    type Output = DynMatrix<T>;

    fn div(self, rhs: T) -> DynMatrix<T> {
        let data = self.data.iter().map(|&x| x / rhs).collect();
        DynMatrix::from_vec(self.nrows, self.ncols, data)
    }
}

impl<T: Scalar> Div<T> for DynMatrix<T> {
    type Output = DynMatrix<T>;
    fn div(self, rhs: T) -> DynMatrix<T> {
        &self / rhs
    }
}

macro_rules! impl_scalar_mul_dyn {
    ($($t:ty),*) => {
        $(
            impl Mul<DynMatrix<$t>> for $t {
                type Output = DynMatrix<$t>;
                fn mul(self, rhs: DynMatrix<$t>) -> DynMatrix<$t> {
                    rhs * self
                }
            }

            impl Mul<&DynMatrix<$t>> for $t {
                type Output = DynMatrix<$t>;
                fn mul(self, rhs: &DynMatrix<$t>) -> DynMatrix<$t> {
                    rhs * self
                }
            }
        )*
    };
}

impl_scalar_mul_dyn!(f32, f64);

// ── Transpose and transposed products ───────────────────────────────

impl<T: Scalar> DynMatrix<T> {
    /// Transpose. The structure tag maps `Lower ↔ Upper`; other tags carry
    /// over unchanged.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// use densolve::dynmatrix::Structure;
    /// let m = DynMatrix::from_rows(2, 3, &[1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// let t = m.transpose();
    /// assert_eq!(t.nrows(), 3);
    /// assert_eq!(t[(2, 1)], 6.0);
    ///
    /// let l = DynMatrix::from_rows(2, 2, &[1.0_f64, 0.0, 2.0, 1.0])
    ///     .with_structure(Structure::Lower);
    /// assert_eq!(l.transpose().structure(), Structure::Upper);
    /// ```
    pub fn transpose(&self) -> Self {
        DynMatrix::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
            .with_structure(self.structure.transposed())
    }

    /// `selfᵗ · rhs` without materializing the transpose.
    pub fn tr_mul(&self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.nrows, rhs.nrows,
            "dimension mismatch: ({}x{})ᵗ * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        DynMatrix::from_fn(self.ncols, rhs.ncols, |i, j| {
            self.col(i)
                .iter()
                .zip(rhs.col(j))
                .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
        })
    }

    /// `self · rhsᵗ` without materializing the transpose.
    pub fn mul_tr(&self, rhs: &DynMatrix<T>) -> DynMatrix<T> {
        assert_eq!(
            self.ncols, rhs.ncols,
            "dimension mismatch: {}x{} * ({}x{})ᵗ",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        DynMatrix::from_fn(self.nrows, rhs.nrows, |i, j| {
            (0..self.ncols).fold(T::zero(), |acc, k| acc + self[(i, k)] * rhs[(j, k)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> DynMatrix<f64> {
        DynMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn add_sub() {
        let b = DynMatrix::fill(2, 3, 1.0);
        let sum = &a() + &b;
        assert_eq!(sum, DynMatrix::from_rows(2, 3, &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
        assert_eq!(sum - b, a());
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn add_mismatch() {
        let _ = a() + DynMatrix::<f64>::zeros(3, 2);
    }

    #[test]
    fn arithmetic_drops_tag() {
        let i = DynMatrix::<f64>::identity(2);
        assert_eq!((&i + &i).structure(), Structure::Unknown);
        assert_eq!((&i * &i).structure(), Structure::Unknown);
        let mut j = i.clone();
        j *= 2.0;
        assert_eq!(j.structure(), Structure::Unknown);
    }

    #[test]
    fn matmul_rectangular() {
        let b = DynMatrix::from_rows(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let c = a() * b;
        assert_eq!(c, DynMatrix::from_rows(2, 2, &[58.0, 64.0, 139.0, 154.0]));
    }

    #[test]
    fn transposed_products() {
        let m = a();
        let b = DynMatrix::from_rows(2, 2, &[1.0, -1.0, 2.0, 0.5]);
        assert_eq!(m.tr_mul(&b), m.transpose() * &b);
        assert_eq!(m.mul_tr(&m), &m * m.transpose());
    }

    #[test]
    fn scalar_ops() {
        let m = a();
        assert_eq!(2.0 * &m, &m * 2.0);
        assert_eq!((&m * 2.0) / 2.0, m);
        assert_eq!(-(-m.clone()), m);
    }

    #[test]
    fn transpose_involution() {
        let m = a();
        assert_eq!(m.transpose().transpose(), m);
    }
}
