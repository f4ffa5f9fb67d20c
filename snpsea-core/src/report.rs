//! Per-SNP report writers: the locus-to-genes table and the per
//! (locus, condition) specificity scores.

use std::io::Write;

use anyhow::Result;
use statrs::distribution::{Binomial, Discrete};

use crate::interval::{GenomicInterval, SnpIntervalMap};
use crate::matrix::{GeneMatrix, MatrixKind};
use crate::resolve::{ResolvedSnps, UserLocus};

/// Bounding interval of a merged locus: the members' chromosome with
/// the smallest start and largest end.
fn locus_interval(locus: &UserLocus, intervals: &SnpIntervalMap) -> Option<GenomicInterval> {
    let mut result: Option<GenomicInterval> = None;
    for snp in &locus.snps {
        let Some(iv) = intervals.get(snp) else {
            continue;
        };
        match &mut result {
            None => result = Some(iv.clone()),
            Some(acc) => {
                acc.start = acc.start.min(iv.start);
                acc.end = acc.end.max(iv.end);
            }
        }
    }
    result
}

/// Write `snp_genes.txt`: one row per absent SNP, per zero-gene SNP,
/// and per (possibly merged) locus.
pub fn write_snp_genes(
    writer: &mut impl Write,
    resolved: &ResolvedSnps,
    loci: &[UserLocus],
    intervals: &SnpIntervalMap,
    row_names: &[String],
) -> Result<()> {
    writeln!(writer, "chrom\tstart\tend\tsnp\tn_genes\tgenes")?;

    for snp in &resolved.absent {
        writeln!(writer, "NA\tNA\tNA\t{}\tNA\tNA", snp)?;
    }

    for snp in &resolved.naked {
        if let Some(iv) = intervals.get(snp) {
            writeln!(writer, "{}\t{}\t{}\t{}\t0\tNA", iv.chrom, iv.start, iv.end, snp)?;
        }
    }

    for locus in loci {
        let Some(iv) = locus_interval(locus, intervals) else {
            continue;
        };
        let genes: Vec<&str> = locus
            .genes
            .iter()
            .map(|&row| row_names[row].as_str())
            .collect();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            iv.chrom,
            iv.start,
            iv.end,
            locus.label,
            locus.genes.len(),
            genes.join(",")
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `snp_condition_scores.txt`: for every (locus, condition)
/// pair, the most specific gene of the locus and the per-gene-set
/// contribution. Binary matrices score the whole geneset with a
/// binomial PMF and leave the gene field empty.
pub fn write_condition_scores(
    writer: &mut impl Write,
    loci: &[UserLocus],
    matrix: &GeneMatrix,
) -> Result<()> {
    writeln!(writer, "snp\tcondition\tgene\tscore")?;

    for locus in loci {
        for col in 0..matrix.ncols() {
            let (gene, score) = match matrix.kind() {
                MatrixKind::Binary { sums, probs } => {
                    let k = locus
                        .genes
                        .iter()
                        .filter(|&&row| matrix.value(row, col) > 0.0)
                        .count() as u64;
                    let binomial = Binomial::new(probs[col], sums[col]).unwrap();
                    (String::new(), binomial.pmf(k))
                }
                MatrixKind::Quantitative => {
                    let mut percentile = 1.0;
                    let mut gene = String::new();
                    for &row in &locus.genes {
                        let v = matrix.value(row, col);
                        if v < percentile {
                            percentile = v;
                            gene = matrix.row_names()[row].clone();
                        }
                    }
                    let score = if percentile < 1.0 {
                        1.0 - (1.0 - percentile).powi(locus.genes.len() as i32)
                    } else {
                        1.0
                    };
                    (gene, score)
                }
            };
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                locus.label,
                matrix.col_names()[col],
                gene,
                score
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}
