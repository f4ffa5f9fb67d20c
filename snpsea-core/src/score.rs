//! Column scoring functions.
//!
//! Four interchangeable kernels keyed on (matrix mode, method). Each
//! takes a condition column and a list of genesets and returns a
//! non-negative enrichment score; larger means the column's specific
//! genes concentrate inside the genesets. Non-finite results clamp
//! to 0.

use statrs::distribution::{ContinuousCDF, Gamma};
use statrs::function::factorial::ln_factorial;

use crate::error::SnpseaError;
use crate::matrix::{GeneMatrix, MatrixKind};

/// The `--score` method: use only the most specific gene per set, or
/// all genes in the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Single,
    Total,
}

impl std::str::FromStr for Method {
    type Err = SnpseaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Method::Single),
            "total" => Ok(Method::Total),
            other => Err(SnpseaError::InvalidParameter(format!(
                "unknown score method '{}' (expected 'single' or 'total')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Single => write!(f, "single"),
            Method::Total => write!(f, "total"),
        }
    }
}

/// The scoring kernel, chosen once per run from (mode, method).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFunction {
    BinarySingle,
    BinaryTotal,
    QuantitativeSingle,
    QuantitativeTotal,
}

impl ScoreFunction {
    pub fn select(binary: bool, method: Method) -> Self {
        match (binary, method) {
            (true, Method::Single) => ScoreFunction::BinarySingle,
            (true, Method::Total) => ScoreFunction::BinaryTotal,
            (false, Method::Single) => ScoreFunction::QuantitativeSingle,
            (false, Method::Total) => ScoreFunction::QuantitativeTotal,
        }
    }
}

/// Read-only scoring context shared by every worker.
#[derive(Clone, Copy)]
pub struct Scorer<'a> {
    matrix: &'a GeneMatrix,
    /// Matrix rows minus matrix genes with no interval; the population
    /// size for the hypergeometric terms.
    effective_rows: usize,
    function: ScoreFunction,
}

impl<'a> Scorer<'a> {
    pub fn new(matrix: &'a GeneMatrix, effective_rows: usize, method: Method) -> Self {
        Scorer {
            matrix,
            effective_rows,
            function: ScoreFunction::select(matrix.is_binary(), method),
        }
    }

    pub fn function(&self) -> ScoreFunction {
        self.function
    }

    pub fn matrix(&self) -> &'a GeneMatrix {
        self.matrix
    }

    /// Score one column against a list of genesets.
    pub fn column_score(&self, col: usize, genesets: &[&[usize]]) -> f64 {
        let score = match self.function {
            ScoreFunction::BinarySingle => self.binary(col, genesets, false),
            ScoreFunction::BinaryTotal => self.binary(col, genesets, true),
            ScoreFunction::QuantitativeSingle => self.quantitative_single(col, genesets),
            ScoreFunction::QuantitativeTotal => self.quantitative_total(col, genesets),
        };
        if score.is_finite() {
            score
        } else {
            0.0
        }
    }

    fn binary(&self, col: usize, genesets: &[&[usize]], total: bool) -> f64 {
        let MatrixKind::Binary { sums, .. } = self.matrix.kind() else {
            return 0.0;
        };
        let n1 = sums[col];
        let n2 = (self.effective_rows as u64).saturating_sub(n1);

        let mut score = 0.0;
        for geneset in genesets {
            let t = geneset.len() as u64;
            let k = geneset
                .iter()
                .filter(|&&row| self.matrix.value(row, col) > 0.0)
                .count() as u64;
            if k == 0 {
                continue;
            }
            if total {
                // Probability of k or more of the column's genes in a
                // random draw of t genes.
                score += -hypergeometric_upper_tail(k, n1, n2, t).ln();
            } else {
                // Probability of at least one hit.
                score += -(1.0 - hypergeometric_pmf(0, n1, n2, t)).ln();
            }
        }
        score
    }

    fn quantitative_single(&self, col: usize, genesets: &[&[usize]]) -> f64 {
        let mut score = 0.0;
        for geneset in genesets {
            let p_min = geneset
                .iter()
                .map(|&row| self.matrix.value(row, col))
                .fold(1.0, f64::min);
            if p_min < 1.0 {
                score += -(1.0 - (1.0 - p_min).powi(geneset.len() as i32)).ln();
            }
        }
        score
    }

    fn quantitative_total(&self, col: usize, genesets: &[&[usize]]) -> f64 {
        let mut score = 0.0;
        for geneset in genesets {
            let s: f64 = geneset
                .iter()
                .map(|&row| -self.matrix.value(row, col).ln())
                .sum();
            // Sum of |set| unit exponentials is Gamma(|set|, 1).
            let gamma = Gamma::new(geneset.len() as f64, 1.0).unwrap();
            score += -gamma.sf(s).ln();
        }
        score
    }
}

/// Log of binomial coefficient: ln(C(n, k)).
fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

/// Hypergeometric PMF: probability of exactly `k` marked genes in a
/// draw of `t` from a population of `n1` marked and `n2` unmarked.
pub fn hypergeometric_pmf(k: u64, n1: u64, n2: u64, t: u64) -> f64 {
    if k > t || t > n1 + n2 {
        return 0.0;
    }
    let log_p = ln_choose(n1, k) + ln_choose(n2, t - k) - ln_choose(n1 + n2, t);
    log_p.exp()
}

/// Hypergeometric upper tail: P(X >= k).
pub fn hypergeometric_upper_tail(k: u64, n1: u64, n2: u64, t: u64) -> f64 {
    let hi = t.min(n1);
    let mut p = 0.0;
    for i in k..=hi {
        p += hypergeometric_pmf(i, n1, n2, t);
    }
    p.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snpsea_linalg::DenseMatrix;

    fn gene_names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("G{}", i)).collect()
    }

    fn binary_matrix() -> GeneMatrix {
        let values = DenseMatrix::from_row_major(4, 1, &[0.0, 1.0, 1.0, 0.0]);
        GeneMatrix::new(gene_names(4), vec!["tissue".to_string()], values)
    }

    fn ranked_matrix() -> GeneMatrix {
        let values = DenseMatrix::from_row_major(4, 1, &[0.25, 0.5, 0.75, 1.0]);
        GeneMatrix::new(gene_names(4), vec!["tissue".to_string()], values)
    }

    #[test]
    fn test_hypergeometric_pmf_sums_to_one() {
        let total: f64 = (0..=5).map(|k| hypergeometric_pmf(k, 5, 7, 5)).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_hypergeometric_upper_tail() {
        // P(X >= 0) = 1
        assert!((hypergeometric_upper_tail(0, 3, 5, 4) - 1.0).abs() < 1e-12);
        // Upper tail is monotone decreasing in k.
        let mut prev = 1.0;
        for k in 0..=4 {
            let p = hypergeometric_upper_tail(k, 3, 5, 4);
            assert!(p <= prev + 1e-15);
            prev = p;
        }
    }

    #[test]
    fn test_binary_single_known_value() {
        let m = binary_matrix();
        let scorer = Scorer::new(&m, 4, Method::Single);
        assert_eq!(scorer.function(), ScoreFunction::BinarySingle);

        // Geneset {1} hits the column; H(0; n1=2, n2=2, t=1) = 1/2.
        let genesets: Vec<&[usize]> = vec![&[1]];
        let score = scorer.column_score(0, &genesets);
        assert!((score - 2.0_f64.ln()).abs() < 1e-10);

        // Geneset {0} misses: score 0.
        let genesets: Vec<&[usize]> = vec![&[0]];
        assert_eq!(scorer.column_score(0, &genesets), 0.0);
    }

    #[test]
    fn test_binary_total_counts_all_hits() {
        let m = binary_matrix();
        let scorer = Scorer::new(&m, 4, Method::Total);

        // Geneset {1, 2} has k=2 hits out of t=2 draws.
        // Q(2) = C(2,2)*C(2,0)/C(4,2) = 1/6.
        let genesets: Vec<&[usize]> = vec![&[1, 2]];
        let score = scorer.column_score(0, &genesets);
        assert!((score - 6.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_quantitative_single_known_value() {
        let m = ranked_matrix();
        let scorer = Scorer::new(&m, 4, Method::Single);
        assert_eq!(scorer.function(), ScoreFunction::QuantitativeSingle);

        // p = 0.25, |set| = 1: score = -ln(1 - (1 - p)^1) = -ln(0.25).
        let genesets: Vec<&[usize]> = vec![&[0]];
        let score = scorer.column_score(0, &genesets);
        assert!((score - (-(0.25_f64).ln())).abs() < 1e-10);
    }

    #[test]
    fn test_quantitative_single_all_nonspecific() {
        let m = ranked_matrix();
        let scorer = Scorer::new(&m, 4, Method::Single);
        // Percentile 1.0 contributes nothing.
        let genesets: Vec<&[usize]> = vec![&[3]];
        assert_eq!(scorer.column_score(0, &genesets), 0.0);
    }

    #[test]
    fn test_quantitative_total_positive() {
        let m = ranked_matrix();
        let scorer = Scorer::new(&m, 4, Method::Total);
        let genesets: Vec<&[usize]> = vec![&[0, 1]];
        let score = scorer.column_score(0, &genesets);
        assert!(score > 0.0);
        assert!(score.is_finite());
    }

    #[test]
    fn test_sets_larger_than_max_genes_score_fully() {
        let values = DenseMatrix::from_row_major(
            12,
            1,
            &(0..12).map(|i| (i + 1) as f64 / 12.0).collect::<Vec<_>>(),
        );
        let m = GeneMatrix::new(gene_names(12), vec!["t".to_string()], values);
        let scorer = Scorer::new(&m, 12, Method::Single);

        let all: Vec<usize> = (0..12).collect();
        let truncated: Vec<usize> = (0..10).collect();
        let s_full = scorer.column_score(0, &[&all]);
        let s_trunc = scorer.column_score(0, &[&truncated]);
        // The full set keeps all 12 genes: the exponent differs.
        assert!(s_full > s_trunc);
    }
}
