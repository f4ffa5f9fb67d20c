//! Gene-by-condition matrix pipeline.
//!
//! Wraps the raw matrix with its row and column names and carries it
//! through the preparation steps: binary detection, conditioning on
//! designated columns, row L2 normalization, and per-column
//! specificity ranking. Binary matrices skip everything after
//! detection and instead cache per-column hit counts.

use snpsea_linalg::DenseMatrix;
use tracing::info;

use crate::error::SnpseaError;

/// Mode decided once from column 0 and fixed for the run.
#[derive(Debug, Clone)]
pub enum MatrixKind {
    /// Every value in column 0 is exactly 0 or 1. `sums[c]` counts the
    /// nonzero rows of column `c`; `probs[c] = sums[c] / R`.
    Binary { sums: Vec<u64>, probs: Vec<f64> },
    Quantitative,
}

/// The gene matrix and its derived state.
#[derive(Debug, Clone)]
pub struct GeneMatrix {
    values: DenseMatrix,
    row_names: Vec<String>,
    col_names: Vec<String>,
    kind: MatrixKind,
}

impl GeneMatrix {
    /// Wrap a loaded matrix and decide its mode from column 0.
    pub fn new(row_names: Vec<String>, col_names: Vec<String>, values: DenseMatrix) -> Self {
        assert_eq!(values.nrows(), row_names.len());
        assert_eq!(values.ncols(), col_names.len());

        let binary = (0..values.nrows()).all(|r| {
            let v = values.get(r, 0);
            v == 0.0 || v == 1.0
        });
        let kind = if binary {
            let nrows = values.nrows() as f64;
            let sums: Vec<u64> = (0..values.ncols())
                .map(|c| (0..values.nrows()).filter(|&r| values.get(r, c) != 0.0).count() as u64)
                .collect();
            let probs = sums.iter().map(|&s| s as f64 / nrows).collect();
            MatrixKind::Binary { sums, probs }
        } else {
            MatrixKind::Quantitative
        };

        GeneMatrix {
            values,
            row_names,
            col_names,
            kind,
        }
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values.get(row, col)
    }

    pub fn kind(&self) -> &MatrixKind {
        &self.kind
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.kind, MatrixKind::Binary { .. })
    }

    /// Verify that every requested condition column exists.
    pub fn check_conditions(&self, names: &[String]) -> Result<(), SnpseaError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.col_names.contains(n))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SnpseaError::MissingCondition { names: missing })
        }
    }

    /// Run the full preparation for this matrix's mode: conditioning,
    /// row normalization, and specificity ranking for quantitative
    /// matrices; nothing beyond detection for binary ones.
    pub fn prepare(&mut self, conditions: &[String]) -> Result<(), SnpseaError> {
        self.check_conditions(conditions)?;
        if self.is_binary() {
            info!("Gene matrix is binary; skipping conditioning and ranking");
            return Ok(());
        }
        self.condition_on(conditions)?;
        self.normalize_rows();
        self.rank_columns();
        Ok(())
    }

    /// Project out the named condition columns, in input order, then
    /// drop them from the matrix and the column names. Each projection
    /// uses the matrix state left by the previous one.
    pub fn condition_on(&mut self, names: &[String]) -> Result<(), SnpseaError> {
        if names.is_empty() {
            return Ok(());
        }
        let mut idxs = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.col_names.iter().position(|c| c == name) {
                Some(i) => idxs.push(i),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(SnpseaError::MissingCondition { names: missing });
        }

        for &b_idx in &idxs {
            let b = self.values.col(b_idx);
            let bb = DenseMatrix::dot(&b, &b);
            if bb == 0.0 {
                continue;
            }
            for col in 0..self.values.ncols() {
                let a = self.values.col(col);
                let coef = DenseMatrix::dot(&a, &b) / bb;
                let projected: Vec<f64> =
                    a.iter().zip(b.iter()).map(|(av, bv)| av - coef * bv).collect();
                self.values.set_col(col, &projected);
            }
        }

        self.values.remove_columns(&idxs);
        let mut drop = idxs;
        drop.sort_unstable();
        drop.dedup();
        for &i in drop.iter().rev() {
            self.col_names.remove(i);
        }
        Ok(())
    }

    /// Divide each row by its L2 norm. Zero rows stay zero.
    pub fn normalize_rows(&mut self) {
        for i in 0..self.values.nrows() {
            let norm = self.values.row_norm(i);
            if norm > 0.0 {
                self.values.scale_row(i, 1.0 / norm);
            }
        }
    }

    /// Replace each column by its specificity percentiles: descending
    /// ranks with average ranks for ties, divided by the row count.
    /// Afterwards every entry is in `{1/R, 2/R, ..., 1}` and small
    /// values mark genes specific to the column.
    pub fn rank_columns(&mut self) {
        let nrows = self.values.nrows() as f64;
        for c in 0..self.values.ncols() {
            let col = self.values.col(c);
            let ranks = rank_descending(&col);
            let percentiles: Vec<f64> = ranks.iter().map(|r| r / nrows).collect();
            self.values.set_col(c, &percentiles);
        }
    }
}

/// Rank data in descending order with tie.method="mean" as in R, so
/// the largest value gets rank 1.
pub fn rank_descending(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut reps = 1;
        while i + reps < order.len() && values[order[i + reps]] == values[order[i]] {
            reps += 1;
        }
        let mean_rank = (2.0 * i as f64 + reps as f64 - 1.0) / 2.0 + 1.0;
        for j in 0..reps {
            ranks[order[i + j]] = mean_rank;
        }
        i += reps;
    }
    ranks
}
