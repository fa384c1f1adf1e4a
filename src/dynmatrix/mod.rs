pub mod aliases;
mod block;
mod norm;
mod ops;
mod structure;

pub use aliases::*;
pub use structure::{Shape, Structure};

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Dynamically-sized heap-allocated matrix.
///
/// Column-major `Vec<T>` storage with dimensions set at construction. Each
/// matrix carries a [`Structure`] tag: a hint the decompositions use to pick
/// fast paths. The tag never participates in equality and arithmetic results
/// are always [`Structure::Unknown`].
///
/// # Examples
///
/// ```
/// use densolve::DynMatrix;
///
/// let a = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
/// assert_eq!(a.ncols(), 2);
///
/// let b = DynMatrix::<f64>::identity(3);
/// assert_eq!(b[(0, 0)], 1.0);
/// assert_eq!(b[(0, 1)], 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct DynMatrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
    structure: Structure,
}

impl<T: PartialEq> PartialEq for DynMatrix<T> {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows && self.ncols == other.ncols && self.data == other.data
    }
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> DynMatrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let m = DynMatrix::<f64>::zeros(2, 3);
    /// assert_eq!(m.nrows(), 2);
    /// assert_eq!(m.ncols(), 3);
    /// assert_eq!(m[(1, 2)], 0.0);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::fill(nrows, ncols, T::zero())
    }

    /// Create a matrix filled with a given value.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
            structure: Structure::Unknown,
        }
    }

    /// Create an `n x n` identity matrix, tagged [`Structure::Diagonal`].
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m.structure = Structure::Diagonal;
        m
    }

    /// Create a square diagonal matrix from its diagonal entries.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// use densolve::dynmatrix::Structure;
    /// let d = DynMatrix::from_diagonal(&[4.0_f64, 9.0]);
    /// assert_eq!(d[(1, 1)], 9.0);
    /// assert_eq!(d.structure(), Structure::Diagonal);
    /// ```
    pub fn from_diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diag.iter().enumerate() {
            m[(i, i)] = d;
        }
        m.structure = Structure::Diagonal;
        m
    }

    /// Create an `n x 1` column from a slice.
    pub fn column(values: &[T]) -> Self {
        Self::from_slice(values.len(), 1, values)
    }

    /// Create a matrix from a flat slice in column-major order.
    ///
    /// Panics if `slice.len() != nrows * ncols`.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// // Column-major: col0=[1,3], col1=[2,4]
    /// let m = DynMatrix::from_slice(2, 2, &[1.0, 3.0, 2.0, 4.0]);
    /// assert_eq!(m[(1, 0)], 3.0);
    /// assert_eq!(m[(0, 1)], 2.0);
    /// ```
    pub fn from_slice(nrows: usize, ncols: usize, slice: &[T]) -> Self {
        assert_eq!(
            slice.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            slice.len(),
            nrows,
            ncols,
        );
        Self::from_vec(nrows, ncols, slice.to_vec())
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let m = DynMatrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// assert_eq!(m[(0, 2)], 3.0);
    /// assert_eq!(m[(1, 0)], 4.0);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        Self::from_fn(nrows, ncols, |i, j| row_major[i * ncols + j])
    }

    /// Create a matrix from an owned `Vec<T>` in column-major order.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            nrows * ncols,
            "vec length {} does not match {}x{} matrix",
            data.len(),
            nrows,
            ncols,
        );
        Self {
            data,
            nrows,
            ncols,
            structure: Structure::Unknown,
        }
    }

    /// New `nrows x ncols` matrix holding the overlapping top-left part of
    /// `self`; any added rows or columns are zero. The tag is dropped.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let m = DynMatrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
    /// let grown = m.resize(3, 1);
    /// assert_eq!(grown.nrows(), 3);
    /// assert_eq!(grown[(1, 0)], 3.0);
    /// assert_eq!(grown[(2, 0)], 0.0);
    /// ```
    pub fn resize(&self, nrows: usize, ncols: usize) -> Self {
        Self::from_fn(nrows, ncols, |i, j| {
            if i < self.nrows && j < self.ncols {
                self[(i, j)]
            } else {
                T::zero()
            }
        })
    }

    /// Entries of the main diagonal.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows.min(self.ncols)).map(|i| self[(i, i)]).collect()
    }

    /// Swap two rows in place.
    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.ncols {
            self.data.swap(j * self.nrows + a, j * self.nrows + b);
        }
    }

    /// Swap two columns in place.
    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.nrows {
            self.data.swap(a * self.nrows + i, b * self.nrows + i);
        }
    }
}

impl<T> DynMatrix<T> {
    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Orientation derived from the dimensions.
    #[inline]
    pub fn shape(&self) -> Shape {
        Shape::of(self.nrows, self.ncols)
    }

    /// Declared structure tag.
    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }

    /// Replace the structure tag. The entries are not checked.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// use densolve::dynmatrix::Structure;
    /// let m = DynMatrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0])
    ///     .with_structure(Structure::Symmetric);
    /// assert_eq!(m.structure(), Structure::Symmetric);
    /// ```
    #[inline]
    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structure = structure;
        self
    }

    #[inline]
    pub fn set_structure(&mut self, structure: Structure) {
        self.structure = structure;
    }

    /// Column-major backing storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Column `j` as a contiguous slice.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        &self.data[j * self.nrows..(j + 1) * self.nrows]
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use densolve::DynMatrix;
    /// let m = DynMatrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self {
            data,
            nrows,
            ncols,
            structure: Structure::Unknown,
        }
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T> MatrixRef<T> for DynMatrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }

    #[inline]
    fn structure(&self) -> Structure {
        self.structure
    }
}

impl<T> MatrixMut<T> for DynMatrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for DynMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for DynMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }
}
