//! Compressed sparse row matrices.
//!
//! Smoothing operators have many rows (one per mesh vertex) but only a handful
//! of contributing seeds per row, so they are stored in CSR form and applied
//! with sparse matrix-vector products.

use nalgebra::DMatrix;
use rayon::prelude::*;

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column index of each stored entry.
    col_idx: Vec<usize>,
    /// Stored values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from per-row `(col, value)` lists.
    ///
    /// Each row must already be sorted by column without duplicates.
    pub fn from_rows(cols: usize, rows: &[Vec<(usize, f64)>]) -> Self {
        let nnz = rows.iter().map(Vec::len).sum();
        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row in rows {
            for &(c, v) in row {
                debug_assert!(c < cols, "column out of bounds");
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows: rows.len(),
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// Sum of the values in row `i`. An empty row sums to `+0.0`.
    pub fn row_sum(&self, i: usize) -> f64 {
        self.row(i).1.iter().fold(0.0, |acc, &v| acc + v)
    }

    /// Whether row `i` has no stored entries.
    #[inline]
    pub fn row_is_empty(&self, i: usize) -> bool {
        self.row_ptr[i] == self.row_ptr[i + 1]
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");
        (0..self.rows).map(|i| self.row_dot(i, x)).collect()
    }

    /// Multiply matrix by vector, splitting rows across the rayon pool.
    pub fn par_mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");
        (0..self.rows)
            .into_par_iter()
            .map(|i| self.row_dot(i, x))
            .collect()
    }

    /// Multiply matrix by every column of a dense matrix: Y = A * X.
    pub fn mul_dense(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        assert_eq!(x.nrows(), self.cols, "Matrix dimension mismatch");
        let mut y = DMatrix::zeros(self.rows, x.ncols());
        for i in 0..self.rows {
            let (cols, vals) = self.row(i);
            for t in 0..x.ncols() {
                let mut sum = 0.0;
                for (&c, &v) in cols.iter().zip(vals) {
                    sum += v * x[(c, t)];
                }
                y[(i, t)] = sum;
            }
        }
        y
    }

    // Folds from +0.0: an empty float `sum()` yields -0.0.
    #[inline]
    fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        let (cols, vals) = self.row(i);
        cols.iter().zip(vals).fold(0.0, |acc, (&c, &v)| acc + v * x[c])
    }
}
