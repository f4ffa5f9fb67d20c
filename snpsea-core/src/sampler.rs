//! Size-matched null geneset sampling.
//!
//! Every SNP in the null list is resolved once; the genesets are kept
//! and binned by effective size `min(|geneset|, MAX_GENES)`. Matched
//! draws pick one geneset per requested size uniformly with
//! replacement. Random draws pick distinct null SNPs for the
//! `randomN` pseudo-source.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::info;

use crate::error::SnpseaError;
use crate::interval::{GeneIndex, SnpIntervalMap};
use crate::resolve::snp_geneset;
use crate::MAX_GENES;

/// All null-pool genesets, binned by effective size.
#[derive(Debug)]
pub struct NullPool {
    /// Every null SNP that resolved to at least one gene.
    genesets: Vec<(String, Vec<usize>)>,
    /// Effective size -> indices into `genesets`.
    bins: BTreeMap<usize, Vec<usize>>,
}

impl NullPool {
    /// Resolve and bin every SNP in the null list.
    pub fn build(
        null_names: &[String],
        intervals: &SnpIntervalMap,
        index: &GeneIndex,
        slop: u64,
    ) -> Result<Self, SnpseaError> {
        let mut genesets = Vec::new();
        for snp in null_names {
            let genes = snp_geneset(snp, intervals, index, slop);
            if !genes.is_empty() {
                genesets.push((snp.clone(), genes));
            }
        }
        if genesets.is_empty() {
            return Err(SnpseaError::EmptyNullPool);
        }
        Ok(Self::from_entries(genesets))
    }

    /// Build directly from genesets, bypassing interval resolution.
    pub fn from_genesets(genesets: Vec<Vec<usize>>) -> Self {
        Self::from_entries(genesets.into_iter().map(|g| (String::new(), g)).collect())
    }

    fn from_entries(genesets: Vec<(String, Vec<usize>)>) -> Self {
        let mut bins: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, (_, genes)) in genesets.iter().enumerate() {
            let size = genes.len().min(MAX_GENES);
            bins.entry(size).or_default().push(i);
        }
        NullPool { genesets, bins }
    }

    /// Number of genesets in the bin for `size`.
    pub fn bin_len(&self, size: usize) -> usize {
        self.bins.get(&size).map_or(0, |b| b.len())
    }

    /// Number of SNPs that resolved to at least one gene.
    pub fn len(&self) -> usize {
        self.genesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genesets.is_empty()
    }

    /// Verify that a matched draw is possible for every requested size.
    pub fn check_sizes(&self, sizes: &[usize]) -> Result<(), SnpseaError> {
        for &s in sizes {
            if self.bin_len(s) == 0 {
                return Err(SnpseaError::EmptyBin { size: s });
            }
        }
        Ok(())
    }

    /// Log how many test loci fall in each bin, with the bin pool sizes.
    pub fn log_occupancy(&self, sizes: &[usize]) {
        info!("On each iteration we will test {} gene sets", sizes.len());
        for (&size, bin) in &self.bins {
            let n_loci = sizes.iter().filter(|&&s| s == size).count();
            if n_loci > 0 {
                let bound = if size == MAX_GENES { ">=" } else { "  " };
                info!(
                    "{:3} gene sets with size {} {:2} from a pool of size {}",
                    n_loci,
                    bound,
                    size,
                    bin.len()
                );
            }
        }
    }

    /// Fill `out` with one uniformly drawn geneset per requested size.
    /// Draws are independent with replacement. Panics on an empty bin;
    /// callers run `check_sizes` during setup.
    pub fn draw_matched<'a>(
        &'a self,
        sizes: &[usize],
        rng: &mut impl Rng,
        out: &mut Vec<&'a [usize]>,
    ) {
        out.clear();
        for &s in sizes {
            let bin = &self.bins[&s];
            let idx = bin[rng.gen_range(0..bin.len())];
            out.push(&self.genesets[idx].1);
        }
    }

    /// One owned size-matched set, used for the null replicates.
    pub fn matched_set(&self, sizes: &[usize], rng: &mut impl Rng) -> Vec<Vec<usize>> {
        let mut views = Vec::with_capacity(sizes.len());
        self.draw_matched(sizes, rng, &mut views);
        views.into_iter().map(|g| g.to_vec()).collect()
    }

    /// `n` distinct indices into the resolvable null SNPs.
    fn random_indices(
        &self,
        n: usize,
        rng: &mut impl Rng,
    ) -> Result<std::collections::BTreeSet<usize>, SnpseaError> {
        if n > self.genesets.len() {
            return Err(SnpseaError::InvalidParameter(format!(
                "randomN requests {} SNPs but only {} null SNPs overlap a gene",
                n,
                self.genesets.len()
            )));
        }
        let mut picked = std::collections::BTreeSet::new();
        while picked.len() < n {
            picked.insert(rng.gen_range(0..self.genesets.len()));
        }
        Ok(picked)
    }

    /// `n` distinct null SNPs that overlap at least one gene, for the
    /// `randomN` pseudo-source.
    pub fn random_snps(&self, n: usize, rng: &mut impl Rng) -> Result<Vec<String>, SnpseaError> {
        Ok(self
            .random_indices(n, rng)?
            .into_iter()
            .map(|i| self.genesets[i].0.clone())
            .collect())
    }

    /// `n` genesets of distinct random null SNPs, without size matching.
    pub fn random_genesets(
        &self,
        n: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Vec<usize>>, SnpseaError> {
        Ok(self
            .random_indices(n, rng)?
            .into_iter()
            .map(|i| self.genesets[i].1.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn pool() -> NullPool {
        NullPool::from_genesets(vec![
            vec![0],
            vec![2],
            vec![3],
            vec![1, 2],
            (0..15).collect(), // clamps into the MAX_GENES bin
        ])
    }

    #[test]
    fn test_bin_keys_clamp() {
        let p = pool();
        assert_eq!(p.bin_len(1), 3);
        assert_eq!(p.bin_len(2), 1);
        assert_eq!(p.bin_len(MAX_GENES), 1);
        assert_eq!(p.bin_len(15), 0);
    }

    #[test]
    fn test_draw_matched_sizes() {
        let p = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut out = Vec::new();
        p.draw_matched(&[1, 2, MAX_GENES], &mut rng, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[1].len(), 2);
        // The top bin keeps the full geneset beyond MAX_GENES.
        assert_eq!(out[2].len(), 15);
    }

    #[test]
    fn test_check_sizes() {
        let p = pool();
        assert!(p.check_sizes(&[1, 2]).is_ok());
        let err = p.check_sizes(&[1, 5]).unwrap_err();
        assert!(matches!(err, SnpseaError::EmptyBin { size: 5 }));
    }

    #[test]
    fn test_random_genesets_distinct() {
        let p = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let sets = p.random_genesets(5, &mut rng).unwrap();
        assert_eq!(sets.len(), 5);
        assert!(p.random_genesets(6, &mut rng).is_err());
    }

    #[test]
    fn test_build_requires_resolvable_snp() {
        use crate::interval::{GeneIndex, GenomicInterval};
        let rows = vec!["A".to_string()];
        let index = GeneIndex::build(
            vec![(
                "A".to_string(),
                GenomicInterval {
                    chrom: "chr1".to_string(),
                    start: 100,
                    end: 200,
                },
            )],
            &rows,
        );
        let mut intervals = SnpIntervalMap::new();
        intervals.insert(
            "rs1".to_string(),
            GenomicInterval {
                chrom: "chr9".to_string(),
                start: 5,
                end: 6,
            },
        );
        let err = NullPool::build(&["rs1".to_string()], &intervals, &index, 10).unwrap_err();
        assert!(matches!(err, SnpseaError::EmptyNullPool));

        intervals.insert(
            "rs2".to_string(),
            GenomicInterval {
                chrom: "chr1".to_string(),
                start: 150,
                end: 151,
            },
        );
        let pool = NullPool::build(
            &["rs1".to_string(), "rs2".to_string()],
            &intervals,
            &index,
            10,
        )
        .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.bin_len(1), 1);
    }
}
