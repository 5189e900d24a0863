//! Dense GF(2^8) matrices
//!
//! Row-major matrices sized at runtime from the codec's `(k, m)`. Provides the
//! normalised Cauchy construction used as the parity generator and the
//! Gauss-Jordan inversion used by the full decoder.

use crate::error::{CodecError, Result};
use crate::galois::Galois8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Galois8>,
}

impl Matrix {
    /// Create a new zero matrix
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Galois8::ZERO; rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zero(size, size);
        for i in 0..size {
            matrix.set(i, i, Galois8::ONE);
        }
        matrix
    }

    /// Normalised Cauchy matrix with an all-ones first row and first column.
    ///
    /// Entry `(i, j)` starts as `1 / (x_i + y_j)` with `x_i = i` and
    /// `y_j = rows + j`, so all `rows + cols` points are distinct. Scaling whole
    /// rows and columns by non-zero constants keeps every square submatrix
    /// non-singular.
    ///
    /// Requires `rows + cols <= 256`.
    pub fn cauchy(rows: usize, cols: usize) -> Self {
        debug_assert!(rows + cols <= 256);
        let mut matrix = Self::zero(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                let x = Galois8::new(i as u8);
                let y = Galois8::new((rows + j) as u8);
                matrix.set(i, j, (x + y).inverse());
            }
        }

        // Columns: make the first row all ones
        for j in 0..cols {
            let scale = matrix.get(0, j).inverse();
            for i in 0..rows {
                let val = matrix.get(i, j);
                matrix.set(i, j, val * scale);
            }
        }

        // Rows: make the first column all ones
        for i in 1..rows {
            let scale = matrix.get(i, 0).inverse();
            for j in 0..cols {
                let val = matrix.get(i, j);
                matrix.set(i, j, val * scale);
            }
        }

        matrix
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Galois8 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Galois8) {
        self.data[row * self.cols + col] = value;
    }

    #[inline]
    pub fn row(&self, row: usize) -> &[Galois8] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Build a matrix from the listed rows of `self`, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &row in rows {
            data.extend_from_slice(self.row(row));
        }
        Self {
            rows: rows.len(),
            cols: self.cols,
            data,
        }
    }

    /// Stack `top` above `bottom`
    pub fn stack(top: &Matrix, bottom: &Matrix) -> Self {
        debug_assert_eq!(top.cols, bottom.cols);
        let mut data = top.data.clone();
        data.extend_from_slice(&bottom.data);
        Self {
            rows: top.rows + bottom.rows,
            cols: top.cols,
            data,
        }
    }

    /// Matrix product `self * rhs`
    #[cfg(test)]
    fn mul(&self, rhs: &Matrix) -> Self {
        debug_assert_eq!(self.cols, rhs.rows);
        let mut result = Self::zero(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let factor = self.get(i, k);
                if factor.is_zero() {
                    continue;
                }
                for j in 0..rhs.cols {
                    let val = result.get(i, j) + factor * rhs.get(k, j);
                    result.set(i, j, val);
                }
            }
        }
        result
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.cols {
            self.data.swap(a * self.cols + col, b * self.cols + col);
        }
    }

    /// Invert a square matrix with Gauss-Jordan elimination.
    ///
    /// `labels` identifies the rows in the returned error (the decoder passes the
    /// source shard indices).
    pub fn invert(&self, labels: &[usize]) -> Result<Matrix> {
        debug_assert_eq!(self.rows, self.cols);
        let size = self.rows;
        let mut work = self.clone();
        let mut inverse = Matrix::identity(size);

        for pivot_row in 0..size {
            // Find pivot
            let Some(found) = (pivot_row..size).find(|&r| !work.get(r, pivot_row).is_zero())
            else {
                return Err(CodecError::SingularMatrix(labels.to_vec()));
            };
            work.swap_rows(pivot_row, found);
            inverse.swap_rows(pivot_row, found);

            // Scale pivot row
            let pivot_inv = work.get(pivot_row, pivot_row).inverse();
            for col in 0..size {
                work.set(pivot_row, col, work.get(pivot_row, col) * pivot_inv);
                inverse.set(pivot_row, col, inverse.get(pivot_row, col) * pivot_inv);
            }

            // Eliminate column
            for row in 0..size {
                if row == pivot_row {
                    continue;
                }
                let factor = work.get(row, pivot_row);
                if factor.is_zero() {
                    continue;
                }
                for col in 0..size {
                    let w = work.get(row, col) + factor * work.get(pivot_row, col);
                    work.set(row, col, w);
                    let v = inverse.get(row, col) + factor * inverse.get(pivot_row, col);
                    inverse.set(row, col, v);
                }
            }
        }

        Ok(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        let identity = Matrix::identity(4);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { Galois8::ONE } else { Galois8::ZERO };
                assert_eq!(identity.get(i, j), expected);
            }
        }
    }

    #[test]
    fn test_cauchy_is_normalised() {
        let c = Matrix::cauchy(4, 6);
        for j in 0..6 {
            assert_eq!(c.get(0, j), Galois8::ONE);
        }
        for i in 0..4 {
            assert_eq!(c.get(i, 0), Galois8::ONE);
        }
        for i in 0..4 {
            for j in 0..6 {
                assert!(!c.get(i, j).is_zero());
            }
        }
    }

    #[test]
    fn test_cauchy_square_submatrices_invertible() {
        let c = Matrix::cauchy(3, 5);
        // Every 2x2 minor of rows (a, b) and columns (x, y)
        for a in 0..3 {
            for b in (a + 1)..3 {
                for x in 0..5 {
                    for y in (x + 1)..5 {
                        let det = c.get(a, x) * c.get(b, y) + c.get(a, y) * c.get(b, x);
                        assert!(!det.is_zero(), "rows {a},{b} cols {x},{y}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_invert_round_trip() {
        let c = Matrix::cauchy(4, 4);
        let inv = c.invert(&[0, 1, 2, 3]).unwrap();
        assert_eq!(c.mul(&inv), Matrix::identity(4));
        assert_eq!(inv.mul(&c), Matrix::identity(4));
    }

    #[test]
    fn test_invert_needs_row_swap() {
        let mut m = Matrix::zero(2, 2);
        m.set(0, 1, Galois8::new(3));
        m.set(1, 0, Galois8::new(5));
        let inv = m.invert(&[0, 1]).unwrap();
        assert_eq!(m.mul(&inv), Matrix::identity(2));
    }

    #[test]
    fn test_singular_matrix_reports_labels() {
        let mut m = Matrix::zero(2, 2);
        m.set(0, 0, Galois8::new(2));
        m.set(0, 1, Galois8::new(4));
        m.set(1, 0, Galois8::new(2));
        m.set(1, 1, Galois8::new(4));
        match m.invert(&[7, 9]) {
            Err(CodecError::SingularMatrix(labels)) => assert_eq!(labels, vec![7, 9]),
            other => panic!("expected singular matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_select_rows_and_stack() {
        let top = Matrix::identity(3);
        let bottom = Matrix::cauchy(2, 3);
        let generator = Matrix::stack(&top, &bottom);
        assert_eq!(generator.rows(), 5);
        let picked = generator.select_rows(&[4, 0]);
        assert_eq!(picked.row(0), bottom.row(1));
        assert_eq!(picked.row(1), top.row(0));
    }
}
