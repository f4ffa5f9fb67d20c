//! Dense matrix operations backed by faer.
//!
//! Column-major layout matching the Eigen conventions used by the
//! original C++ code, so per-condition column scoring walks
//! contiguous memory.

use faer::Mat;

/// A dense matrix wrapper around faer's `Mat<f64>`.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    inner: Mat<f64>,
}

impl DenseMatrix {
    /// Create a new dense matrix filled with zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            inner: Mat::zeros(nrows, ncols),
        }
    }

    /// Create a dense matrix from a flat vec (column-major order).
    pub fn from_col_major(nrows: usize, ncols: usize, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), nrows * ncols);
        let inner = Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i]);
        Self { inner }
    }

    /// Create a dense matrix from a flat slice (row-major input).
    pub fn from_row_major(nrows: usize, ncols: usize, data: &[f64]) -> Self {
        assert_eq!(data.len(), nrows * ncols);
        let inner = Mat::from_fn(nrows, ncols, |i, j| data[i * ncols + j]);
        Self { inner }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    /// Get element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner.read(row, col)
    }

    /// Set element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.inner.write(row, col, value);
    }

    /// Extract column as a Vec<f64>.
    pub fn col(&self, j: usize) -> Vec<f64> {
        let n = self.nrows();
        let mut v = Vec::with_capacity(n);
        for i in 0..n {
            v.push(self.inner.read(i, j));
        }
        v
    }

    /// Set an entire column from a slice.
    pub fn set_col(&mut self, j: usize, data: &[f64]) {
        assert_eq!(data.len(), self.nrows());
        for (i, &x) in data.iter().enumerate() {
            self.inner.write(i, j, x);
        }
    }

    /// Dot product of two columns.
    pub fn col_dot(&self, a: usize, b: usize) -> f64 {
        let mut s = 0.0;
        for i in 0..self.nrows() {
            s += self.inner.read(i, a) * self.inner.read(i, b);
        }
        s
    }

    /// L2 norm of a row.
    pub fn row_norm(&self, i: usize) -> f64 {
        let mut s = 0.0;
        for j in 0..self.ncols() {
            let v = self.inner.read(i, j);
            s += v * v;
        }
        s.sqrt()
    }

    /// Scale every element of a row.
    pub fn scale_row(&mut self, i: usize, factor: f64) {
        for j in 0..self.ncols() {
            let v = self.inner.read(i, j);
            self.inner.write(i, j, v * factor);
        }
    }

    /// Remove the given columns, preserving the order of the survivors.
    /// Duplicate indices are removed once.
    pub fn remove_columns(&mut self, idxs: &[usize]) {
        let mut drop = idxs.to_vec();
        drop.sort_unstable();
        drop.dedup();

        let keep: Vec<usize> = (0..self.ncols())
            .filter(|j| drop.binary_search(j).is_err())
            .collect();
        let inner = Mat::from_fn(self.nrows(), keep.len(), |i, j| {
            self.inner.read(i, keep[j])
        });
        self.inner = inner;
    }

    /// Dot product of two slices.
    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }
}
